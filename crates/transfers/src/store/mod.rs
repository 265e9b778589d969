//! Store module exports

pub mod memory;
pub mod traits;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryTransferStore;
pub use traits::TransferStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresTransferStore;
