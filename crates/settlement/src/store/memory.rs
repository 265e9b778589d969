//! In-memory settlement stores

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use common::TransactionId;

use crate::error::{Result, SettlementError};
use crate::idempotency::IdempotencyRecord;
use crate::store::traits::{IdempotencyStore, TransactionStore};
use crate::types::Transaction;

/// In-memory deal store
pub struct InMemoryTransactionStore {
    transactions: RwLock<HashMap<TransactionId, Transaction>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self {
            transactions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, transaction: &Transaction) -> Result<()> {
        let mut transactions = self.transactions.write();
        if transactions.contains_key(&transaction.id) {
            return Err(SettlementError::Storage(format!(
                "transaction {} already exists",
                transaction.id
            )));
        }
        transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>> {
        Ok(self.transactions.read().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Transaction>> {
        let mut list: Vec<Transaction> = self.transactions.read().values().cloned().collect();
        list.sort_by_key(|t| (t.created_at, t.id));
        Ok(list)
    }

    async fn compare_and_swap(&self, transaction: &Transaction, expected_version: u64) -> Result<()> {
        let mut transactions = self.transactions.write();
        let stored = transactions
            .get_mut(&transaction.id)
            .ok_or(SettlementError::NotFound(transaction.id))?;
        if stored.version != expected_version {
            return Err(SettlementError::Conflict {
                transaction_id: transaction.id,
                expected: expected_version,
                actual: stored.version,
            });
        }
        *stored = transaction.clone();
        Ok(())
    }
}

/// In-memory idempotency store
pub struct InMemoryIdempotencyStore {
    records: RwLock<HashMap<(TransactionId, String), IdempotencyRecord>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn get(&self, transaction_id: TransactionId, key: &str) -> Result<Option<IdempotencyRecord>> {
        Ok(self
            .records
            .read()
            .get(&(transaction_id, key.to_string()))
            .cloned())
    }

    async fn record(&self, record: &IdempotencyRecord) -> Result<()> {
        self.records
            .write()
            .entry((record.transaction_id, record.key.clone()))
            .or_insert_with(|| record.clone());
        Ok(())
    }
}
