//! TransferStore trait definition

use async_trait::async_trait;

use common::{DivisionOrderId, TransferId};

use crate::error::Result;
use crate::types::{OwnershipTransfer, TransferStatus};

/// Persistence for ownership transfers
#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Insert a newly proposed transfer
    async fn insert(&self, transfer: &OwnershipTransfer) -> Result<()>;

    /// Get a transfer by id
    async fn get(&self, id: TransferId) -> Result<Option<OwnershipTransfer>>;

    /// List transfers, oldest first
    ///
    /// # Arguments
    /// * `division_order_id` - Restrict to one division order
    /// * `status` - Restrict to one status
    async fn list(
        &self,
        division_order_id: Option<DivisionOrderId>,
        status: Option<TransferStatus>,
    ) -> Result<Vec<OwnershipTransfer>>;

    /// Replace a transfer if its stored status is still `expected`
    ///
    /// # Returns
    /// `TransferError::StatusConflict` when another caller moved it first
    async fn compare_and_set(&self, transfer: &OwnershipTransfer, expected: TransferStatus) -> Result<()>;
}
