//! Ledger error types

use common::{DecimalInterest, DivisionOrderId, OwnerId};
use thiserror::Error;

/// Errors that can occur in the ownership ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Unknown division order
    #[error("Division order not found: {0}")]
    NotFound(DivisionOrderId),

    /// Optimistic version mismatch
    #[error("Version conflict on division order {division_order_id}: expected {expected}, found {actual}")]
    Conflict {
        division_order_id: DivisionOrderId,
        expected: u64,
        actual: u64,
    },

    /// Source owner holds less than the amount being moved
    #[error("Insufficient interest on division order {division_order_id}: owner {owner} holds {available}, requested {requested}")]
    InsufficientInterest {
        division_order_id: DivisionOrderId,
        owner: OwnerId,
        available: DecimalInterest,
        requested: DecimalInterest,
    },

    /// Initial allocation would exceed a whole interest
    #[error("Allocation totals {total}, which exceeds 1.00000000")]
    OverAllocated { total: DecimalInterest },

    /// Initial allocation is malformed
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    /// Transfer instruction is malformed
    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    /// Ledger has been soft-retired
    #[error("Division order {0} is retired")]
    Retired(DivisionOrderId),

    /// A mutation would break conservation of interest
    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Conflict { .. })
    }
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
