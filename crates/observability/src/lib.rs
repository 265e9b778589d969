//! Observability infrastructure for WellShare
//!
//! This crate provides:
//! - Structured logging via tracing
//! - Prometheus metrics
//! - Engine counter helpers shared by the ledger and settlement crates
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("wellshare", LogFormat::Pretty, "info")?;
//! observability::metrics::init_metrics(9100)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{init_metrics, EngineMetrics};
