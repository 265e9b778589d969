//! Settlement store traits

use async_trait::async_trait;

use common::TransactionId;

use crate::error::Result;
use crate::idempotency::IdempotencyRecord;
use crate::types::Transaction;

/// Persistence for deals
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert a newly initiated deal
    async fn insert(&self, transaction: &Transaction) -> Result<()>;

    /// Get a deal by id
    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>>;

    /// List all deals, oldest first
    async fn list(&self) -> Result<Vec<Transaction>>;

    /// Replace a deal if its stored version matches
    ///
    /// # Returns
    /// `SettlementError::Conflict` carrying the stored version when it does not match
    async fn compare_and_swap(&self, transaction: &Transaction, expected_version: u64) -> Result<()>;
}

/// Keyed results of settlement transitions, scoped per transaction
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Look up a key on a transaction
    async fn get(&self, transaction_id: TransactionId, key: &str) -> Result<Option<IdempotencyRecord>>;

    /// Store a record; an existing record under the same key is kept
    async fn record(&self, record: &IdempotencyRecord) -> Result<()>;
}
