//! LedgerStore trait definition

use async_trait::async_trait;

use common::DivisionOrderId;

use crate::error::Result;
use crate::types::DivisionOrder;

/// Persistence for division orders
///
/// Implementations must make [`LedgerStore::compare_and_swap`] atomic: the
/// write lands only if the stored version still equals `expected_version`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a new division order
    async fn insert(&self, order: &DivisionOrder) -> Result<()>;

    /// Get a division order by id
    async fn get(&self, id: DivisionOrderId) -> Result<Option<DivisionOrder>>;

    /// List all division orders, oldest first
    async fn list(&self) -> Result<Vec<DivisionOrder>>;

    /// Replace a division order if its stored version matches
    ///
    /// # Returns
    /// `LedgerError::Conflict` carrying the stored version when it does not match
    async fn compare_and_swap(&self, order: &DivisionOrder, expected_version: u64) -> Result<()>;
}
