//! Deal settlement for WellShare
//!
//! Drives a transaction through
//! `Created -> EarnestDeposited -> DueDiligenceComplete -> Funded -> Closed`
//! (or `Cancelled`). Every transition carries a caller-supplied
//! idempotency key so that retries after a timeout are safe.
//!
//! # Modules
//!
//! - [`machine`] - [`SettlementStateMachine`]
//! - [`idempotency`] - Request fingerprints and replay decisions
//! - [`payments`] - [`PaymentVerifier`] collaborator
//! - [`finalizer`] - [`TransferFinalizer`] seam used at close
//! - [`store`] - Deal and idempotency stores

pub mod error;
pub mod finalizer;
pub mod idempotency;
pub mod machine;
pub mod payments;
pub mod store;
pub mod types;

#[cfg(feature = "api")]
pub mod api;

pub use error::{Result, SettlementError};
pub use finalizer::{DealLink, FinalizationFailure, TransferFinalizer};
pub use idempotency::IdempotencyRecord;
pub use machine::{SettlementConfig, SettlementStateMachine, DEFAULT_MAX_IDEMPOTENCY_KEY_LENGTH};
pub use payments::{PaymentCheck, PaymentKind, PaymentVerifier, StaticPaymentVerifier};
pub use store::{
    IdempotencyStore, InMemoryIdempotencyStore, InMemoryTransactionStore, TransactionStore,
};
pub use types::{
    Cancellation, Closing, DealTerms, DueDiligence, EarnestDeposit, Funding, Operation,
    SettlementStatus, StatusChange, Transaction, TransitionInput,
};

#[cfg(feature = "client")]
pub use payments::http::HttpPaymentVerifier;

#[cfg(feature = "postgres")]
pub use store::{PostgresIdempotencyStore, PostgresTransactionStore};
