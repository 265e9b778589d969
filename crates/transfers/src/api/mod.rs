//! HTTP API for the transfer workflow

pub mod handlers;
pub mod routes;

pub use handlers::{error_response, TransferApiState};
pub use routes::create_router;
