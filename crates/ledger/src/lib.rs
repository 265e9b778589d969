//! Ownership ledger for WellShare division orders
//!
//! Holds the authoritative fractional-interest records of each division
//! order and enforces conservation: transfers move interest between
//! parties but never create or destroy it.
//!
//! # Modules
//!
//! - [`types`] - Division order, interest and transfer instruction types
//! - [`ledger`] - [`OwnershipLedger`] service
//! - [`store`] - [`LedgerStore`] trait with in-memory and Postgres backends
//! - [`event`] - Change events broadcast after each mutation
//! - [`locks`] - Per-key async locks
//! - `api` - HTTP handlers (requires the `api` feature)

pub mod error;
pub mod event;
pub mod ledger;
pub mod locks;
pub mod store;
pub mod types;

#[cfg(feature = "api")]
pub mod api;

pub use error::{LedgerError, Result};
pub use event::LedgerEvent;
pub use ledger::OwnershipLedger;
pub use locks::{KeyedLocks, LedgerLocks};
pub use store::{InMemoryLedgerStore, LedgerStore};
pub use types::{
    AllocationEntry, DivisionOrder, DivisionOrderSummary, InterestStatus, LedgerSnapshot,
    OwnerInterest, TransferInstruction,
};

#[cfg(feature = "postgres")]
pub use store::PostgresLedgerStore;
