//! Settlement error types

use common::{TransactionId, TransferId};
use thiserror::Error;

use crate::types::SettlementStatus;

/// Errors that can occur during settlement operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    /// Unknown transaction
    #[error("Transaction not found: {0}")]
    NotFound(TransactionId),

    /// Operation called out of order
    #[error("Cannot {operation} transaction {transaction_id}: expected {expected}, found {actual}")]
    InvalidTransition {
        transaction_id: TransactionId,
        operation: &'static str,
        expected: &'static str,
        actual: SettlementStatus,
    },

    /// Idempotency key reused for a different request
    #[error("Idempotency key '{key}' on transaction {transaction_id} was already used for a different request")]
    IdempotencyConflict { transaction_id: TransactionId, key: String },

    /// Idempotency key missing or malformed
    #[error("Invalid idempotency key: {0}")]
    InvalidIdempotencyKey(String),

    /// Optimistic version mismatch
    #[error("Version conflict on transaction {transaction_id}: expected {expected}, found {actual}")]
    Conflict {
        transaction_id: TransactionId,
        expected: u64,
        actual: u64,
    },

    /// Payments collaborator reports the amount has not cleared
    #[error("Payment {payment_reference} has not cleared")]
    PaymentNotCleared { payment_reference: String },

    /// Payments collaborator could not be reached
    #[error("Payment verification unavailable: {0}")]
    PaymentUnavailable(String),

    /// Ownership transfers tied to the deal could not be finalized
    #[error("Finalization failed for transfer {transfer_id}: {reason}")]
    Finalization { transfer_id: TransferId, reason: String },

    /// Request payload rejected
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for SettlementError {
    fn from(e: serde_json::Error) -> Self {
        SettlementError::Storage(format!("serialization: {}", e))
    }
}

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, SettlementError>;
