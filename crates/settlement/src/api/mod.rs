//! HTTP API for settlement

pub mod handlers;
pub mod routes;

pub use handlers::{SettlementApiState, IDEMPOTENCY_KEY_HEADER};
pub use routes::create_router;
