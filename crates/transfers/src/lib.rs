//! Ownership transfer workflow for WellShare
//!
//! Orchestrates `pending -> approved -> applied | rejected` transfers
//! against the [`ledger::OwnershipLedger`], retrying optimistic version
//! conflicts within a bounded budget.

pub mod error;
pub mod store;
pub mod types;
pub mod workflow;

#[cfg(feature = "api")]
pub mod api;

pub use error::{Result, TransferError};
pub use store::{InMemoryTransferStore, TransferStore};
pub use types::{OwnershipTransfer, ProposeTransfer, TransferStatus, TransferType};
pub use workflow::{TransferWorkflow, WorkflowConfig};

#[cfg(feature = "postgres")]
pub use store::PostgresTransferStore;
