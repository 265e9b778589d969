//! HTTP API for distribution previews

pub mod handlers;
pub mod routes;

pub use handlers::DistributionApiState;
pub use routes::create_router;
