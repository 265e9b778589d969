//! Ownership finalization at deal close

use std::collections::btree_map::{BTreeMap, Entry};

use async_trait::async_trait;

use common::{DivisionOrderId, OwnerId, TransferId};
use ledger::DivisionOrder;
use transfers::{OwnershipTransfer, TransferStatus, TransferWorkflow};

/// Why a linked transfer could not be finalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizationFailure {
    pub transfer_id: TransferId,
    pub reason: String,
}

/// Deal terms a linked transfer has to agree with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DealLink {
    pub seller_id: OwnerId,
    /// When set, every linked transfer must move interest on this order
    pub division_order_id: Option<DivisionOrderId>,
}

/// Applies the ownership changes tied to a deal
#[async_trait]
pub trait TransferFinalizer: Send + Sync {
    /// Check a transfer can be linked to a deal
    async fn check_linkable(&self, transfer_id: TransferId, deal: DealLink) -> Result<(), FinalizationFailure>;

    /// Apply every transfer, or fail without leaving the deal half-closed
    ///
    /// Must be safe to call again after a failure.
    async fn finalize(&self, transfer_ids: &[TransferId]) -> Result<(), FinalizationFailure>;
}

fn failure(transfer_id: TransferId, e: impl ToString) -> FinalizationFailure {
    FinalizationFailure {
        transfer_id,
        reason: e.to_string(),
    }
}

/// Replay outstanding transfers against copies of their ledgers
///
/// Nothing is written. Transfers the ledger already holds are skipped,
/// so a close that failed part way can be retried.
async fn rehearse(workflow: &TransferWorkflow, transfers: &[OwnershipTransfer]) -> Result<(), FinalizationFailure> {
    let mut drafts: BTreeMap<DivisionOrderId, DivisionOrder> = BTreeMap::new();
    for transfer in transfers {
        let draft = match drafts.entry(transfer.division_order_id) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let order = workflow
                    .ledger()
                    .get(transfer.division_order_id)
                    .await
                    .map_err(|e| failure(transfer.id, e))?;
                e.insert(order)
            }
        };
        if draft.has_applied(transfer.id) {
            continue;
        }
        draft
            .apply_transfer(&transfer.instruction())
            .map_err(|e| failure(transfer.id, e))?;
    }
    Ok(())
}

#[async_trait]
impl TransferFinalizer for TransferWorkflow {
    async fn check_linkable(&self, transfer_id: TransferId, deal: DealLink) -> Result<(), FinalizationFailure> {
        let transfer = self
            .get(transfer_id)
            .await
            .map_err(|e| failure(transfer_id, e))?;
        if transfer.status == TransferStatus::Rejected {
            return Err(failure(transfer_id, "transfer was rejected"));
        }
        if transfer.from_owner_id != deal.seller_id {
            return Err(failure(
                transfer_id,
                format!(
                    "transfer moves interest from {}, not the seller {}",
                    transfer.from_owner_id, deal.seller_id
                ),
            ));
        }
        if let Some(expected) = deal.division_order_id {
            if transfer.division_order_id != expected {
                return Err(failure(
                    transfer_id,
                    format!(
                        "transfer is on division order {}, deal is on {}",
                        transfer.division_order_id, expected
                    ),
                ));
            }
        }
        Ok(())
    }

    async fn finalize(&self, transfer_ids: &[TransferId]) -> Result<(), FinalizationFailure> {
        let mut outstanding = Vec::with_capacity(transfer_ids.len());
        for &id in transfer_ids {
            let transfer = self.get(id).await.map_err(|e| failure(id, e))?;
            match transfer.status {
                TransferStatus::Applied => {}
                TransferStatus::Approved => outstanding.push(transfer),
                status => {
                    return Err(failure(id, format!("transfer is {}, expected approved", status)));
                }
            }
        }

        // Every transfer must fit the balances before any of them lands.
        rehearse(self, &outstanding).await?;

        for transfer in &outstanding {
            self.apply(transfer.id).await.map_err(|e| failure(transfer.id, e))?;
        }
        Ok(())
    }
}
