//! Transfer workflow error types

use common::{DecimalInterest, TransferId};
use ledger::LedgerError;
use thiserror::Error;

use crate::types::TransferStatus;

/// Errors that can occur in the transfer workflow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Unknown transfer
    #[error("Transfer not found: {0}")]
    NotFound(TransferId),

    /// Proposal rejected before reaching the ledger
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not allowed from the transfer's current status
    #[error("Cannot {operation} transfer {transfer_id} in status {actual}")]
    InvalidTransition {
        transfer_id: TransferId,
        operation: &'static str,
        actual: TransferStatus,
    },

    /// Source owner no longer holds enough interest; the transfer was rejected
    #[error("Transfer {transfer_id} rejected: source holds {available}, requested {requested}")]
    InsufficientInterest {
        transfer_id: TransferId,
        available: DecimalInterest,
        requested: DecimalInterest,
    },

    /// Ledger contention persisted past the retry budget
    #[error("Transfer {transfer_id} still conflicting after {attempts} attempts")]
    Conflict { transfer_id: TransferId, attempts: u32 },

    /// Stored status changed underneath a status update
    #[error("Transfer {transfer_id} status changed: expected {expected}, found {actual}")]
    StatusConflict {
        transfer_id: TransferId,
        expected: TransferStatus,
        actual: TransferStatus,
    },

    /// Ledger error
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for transfer operations
pub type Result<T> = std::result::Result<T, TransferError>;
