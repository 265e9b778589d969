//! Revenue distribution for WellShare
//!
//! [`calculator`] is a pure largest-remainder apportionment whose payment
//! lines always sum to the revenue total. [`DistributionService`] runs it
//! over a live ledger snapshot for read-only previews.

pub mod calculator;
pub mod error;
pub mod service;
pub mod types;

#[cfg(feature = "api")]
pub mod api;

pub use calculator::{allocate, calculate};
pub use error::{DistributionError, Result};
pub use service::DistributionService;
pub use types::{DistributionRequest, OwnerPayment, OwnerShare, RevenueDistribution, RevenueType};
