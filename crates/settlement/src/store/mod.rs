//! Store module exports

pub mod memory;
pub mod traits;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{InMemoryIdempotencyStore, InMemoryTransactionStore};
pub use traits::{IdempotencyStore, TransactionStore};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresIdempotencyStore, PostgresTransactionStore};
