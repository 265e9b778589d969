//! HTTP serving infrastructure for WellShare
//!
//! [`HttpServer`] runs an Axum router until a `CancellationToken` fires,
//! with `/health` mounted beside the API. Shutdown is driven from a single
//! [`ShutdownController`] so every background task stops together.

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod port_validator;
pub mod shutdown;
pub mod traits;

pub use config::{ports, ServerConfig};
pub use error::{Result, ServerError};
pub use health::{ComponentStatus, HealthClient, HealthState};
pub use http::HttpServer;
pub use port_validator::validate_ports_available;
pub use shutdown::{shutdown_signal, ShutdownController};
pub use traits::{Server, ServerExt};
