//! Distribution error types

use ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur when computing a distribution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributionError {
    /// Nobody holds a non-zero interest
    #[error("No owners to distribute to")]
    NoOwners,

    /// Revenue amount is not acceptable
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Ledger read failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result type for distribution operations
pub type Result<T> = std::result::Result<T, DistributionError>;
