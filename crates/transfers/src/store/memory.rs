//! In-memory transfer store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use common::{DivisionOrderId, TransferId};

use crate::error::{Result, TransferError};
use crate::store::traits::TransferStore;
use crate::types::{OwnershipTransfer, TransferStatus};

/// In-memory transfer store for tests and single-node development
pub struct InMemoryTransferStore {
    transfers: RwLock<HashMap<TransferId, OwnershipTransfer>>,
}

impl InMemoryTransferStore {
    pub fn new() -> Self {
        Self {
            transfers: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryTransferStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransferStore for InMemoryTransferStore {
    async fn insert(&self, transfer: &OwnershipTransfer) -> Result<()> {
        let mut transfers = self.transfers.write();
        if transfers.contains_key(&transfer.id) {
            return Err(TransferError::Storage(format!(
                "transfer {} already exists",
                transfer.id
            )));
        }
        transfers.insert(transfer.id, transfer.clone());
        Ok(())
    }

    async fn get(&self, id: TransferId) -> Result<Option<OwnershipTransfer>> {
        Ok(self.transfers.read().get(&id).cloned())
    }

    async fn list(
        &self,
        division_order_id: Option<DivisionOrderId>,
        status: Option<TransferStatus>,
    ) -> Result<Vec<OwnershipTransfer>> {
        let mut list: Vec<OwnershipTransfer> = self
            .transfers
            .read()
            .values()
            .filter(|t| division_order_id.map_or(true, |id| t.division_order_id == id))
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        list.sort_by_key(|t| (t.created_at, t.id));
        Ok(list)
    }

    async fn compare_and_set(&self, transfer: &OwnershipTransfer, expected: TransferStatus) -> Result<()> {
        let mut transfers = self.transfers.write();
        let stored = transfers
            .get_mut(&transfer.id)
            .ok_or(TransferError::NotFound(transfer.id))?;
        if stored.status != expected {
            return Err(TransferError::StatusConflict {
                transfer_id: transfer.id,
                expected,
                actual: stored.status,
            });
        }
        *stored = transfer.clone();
        Ok(())
    }
}
