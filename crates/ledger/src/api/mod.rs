//! HTTP API for the ownership ledger

pub mod handlers;
pub mod routes;

pub use handlers::{error_response, LedgerApiState};
pub use routes::create_router;
