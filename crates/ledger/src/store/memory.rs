//! In-memory ledger store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use common::DivisionOrderId;

use crate::error::{LedgerError, Result};
use crate::store::traits::LedgerStore;
use crate::types::DivisionOrder;

/// In-memory ledger store for tests and single-node development
pub struct InMemoryLedgerStore {
    orders: RwLock<HashMap<DivisionOrderId, DivisionOrder>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert(&self, order: &DivisionOrder) -> Result<()> {
        let mut orders = self.orders.write();
        if orders.contains_key(&order.id) {
            return Err(LedgerError::Storage(format!(
                "division order {} already exists",
                order.id
            )));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, id: DivisionOrderId) -> Result<Option<DivisionOrder>> {
        Ok(self.orders.read().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<DivisionOrder>> {
        let mut orders: Vec<DivisionOrder> = self.orders.read().values().cloned().collect();
        orders.sort_by_key(|o| (o.created_at, o.id));
        Ok(orders)
    }

    async fn compare_and_swap(&self, order: &DivisionOrder, expected_version: u64) -> Result<()> {
        let mut orders = self.orders.write();
        let stored = orders.get_mut(&order.id).ok_or(LedgerError::NotFound(order.id))?;
        if stored.version != expected_version {
            return Err(LedgerError::Conflict {
                division_order_id: order.id,
                expected: expected_version,
                actual: stored.version,
            });
        }
        *stored = order.clone();
        Ok(())
    }
}
