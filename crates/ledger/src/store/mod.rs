//! Store module exports

pub mod memory;
pub mod traits;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryLedgerStore;
pub use traits::LedgerStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresLedgerStore;
