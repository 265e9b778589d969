//! Ownership ledger - authoritative interest records per division order

use std::sync::Arc;

use tokio::sync::broadcast;

use common::DivisionOrderId;
use observability::EngineMetrics;

use crate::error::{LedgerError, Result};
use crate::event::LedgerEvent;
use crate::locks::LedgerLocks;
use crate::store::LedgerStore;
use crate::types::{AllocationEntry, DivisionOrder, DivisionOrderSummary, LedgerSnapshot, TransferInstruction};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Ownership ledger
///
/// Every mutation of one division order runs under that order's async
/// lock and is persisted with a compare-and-swap on its version, so
/// transfers against the same ledger are linearized while different
/// ledgers proceed in parallel.
pub struct OwnershipLedger {
    store: Arc<dyn LedgerStore>,
    locks: LedgerLocks,
    events: broadcast::Sender<LedgerEvent>,
    metrics: EngineMetrics,
}

impl OwnershipLedger {
    /// Create a new OwnershipLedger
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            locks: LedgerLocks::new(),
            events,
            metrics: EngineMetrics,
        }
    }

    /// Create a ledger backed by an in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(crate::store::InMemoryLedgerStore::new()))
    }

    /// Subscribe to ledger change events
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Import the initial allocation for an asset
    pub async fn allocate(
        &self,
        asset_reference: impl Into<String>,
        entries: Vec<AllocationEntry>,
    ) -> Result<DivisionOrder> {
        let order = DivisionOrder::from_allocation(asset_reference, entries)?;
        self.store.insert(&order).await?;

        tracing::info!(
            division_order_id = %order.id,
            asset_reference = %order.asset_reference,
            owners = order.interests.len(),
            total = %order.active_total(),
            "Division order allocated"
        );
        self.metrics.allocation_imported();
        self.publish(LedgerEvent::Allocated {
            division_order_id: order.id,
            owner_count: order.interests.len(),
            total_interest: order.active_total(),
            version: order.version,
        });

        Ok(order)
    }

    /// Current interests and version of a division order
    pub async fn get_interests(&self, id: DivisionOrderId) -> Result<LedgerSnapshot> {
        Ok(self.get(id).await?.snapshot())
    }

    /// Full division order record
    pub async fn get(&self, id: DivisionOrderId) -> Result<DivisionOrder> {
        self.store.get(id).await?.ok_or(LedgerError::NotFound(id))
    }

    /// Summaries of every division order
    pub async fn list(&self) -> Result<Vec<DivisionOrderSummary>> {
        Ok(self.store.list().await?.iter().map(DivisionOrder::summary).collect())
    }

    /// Apply a transfer against an expected ledger version
    ///
    /// A transfer id that was already applied returns the current version
    /// without touching the ledger. Otherwise the version is checked first
    /// (`Conflict`), then the source balance (`InsufficientInterest`).
    pub async fn apply_transfer(
        &self,
        id: DivisionOrderId,
        instruction: &TransferInstruction,
        expected_version: u64,
    ) -> Result<u64> {
        let _guard = self.locks.lock(id).await;

        let order = self.get(id).await?;
        if order.has_applied(instruction.transfer_id) {
            tracing::debug!(
                division_order_id = %id,
                transfer_id = %instruction.transfer_id,
                version = order.version,
                "Transfer already applied"
            );
            return Ok(order.version);
        }
        if order.version != expected_version {
            self.metrics.version_conflict();
            return Err(LedgerError::Conflict {
                division_order_id: id,
                expected: expected_version,
                actual: order.version,
            });
        }

        let mut next = order;
        let version = next.apply_transfer(instruction)?;
        if let Err(e) = self.store.compare_and_swap(&next, expected_version).await {
            if e.is_retryable() {
                self.metrics.version_conflict();
            }
            return Err(e);
        }

        tracing::info!(
            division_order_id = %id,
            transfer_id = %instruction.transfer_id,
            from = %instruction.from_owner_id,
            to = %instruction.to,
            amount = %instruction.interest_amount,
            version,
            "Transfer applied to ledger"
        );
        self.metrics.transfer_applied();
        self.publish(LedgerEvent::TransferApplied {
            division_order_id: id,
            transfer_id: instruction.transfer_id,
            from_owner_id: instruction.from_owner_id,
            to: instruction.to.clone(),
            interest_amount: instruction.interest_amount,
            version,
        });

        Ok(version)
    }

    /// Soft-retire a division order
    pub async fn retire(&self, id: DivisionOrderId) -> Result<DivisionOrder> {
        let _guard = self.locks.lock(id).await;

        let mut order = self.get(id).await?;
        let expected = order.version;
        if !order.retire() {
            return Ok(order);
        }
        self.store.compare_and_swap(&order, expected).await?;

        tracing::info!(division_order_id = %id, version = order.version, "Division order retired");
        self.publish(LedgerEvent::Retired {
            division_order_id: id,
            version: order.version,
        });

        Ok(order)
    }

    fn publish(&self, event: LedgerEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}
