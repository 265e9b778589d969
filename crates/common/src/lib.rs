//! Common types and utilities for WellShare
//!
//! This crate provides shared types used across all WellShare crates.
//!
//! # Modules
//!
//! - [`error`] - Common error types
//! - [`types`] - Identifiers and the [`Party`] holder model
//! - [`fixedpoint`] - [`DecimalInterest`] and [`Money`]
//! - [`api`] - Shared HTTP response envelopes

pub mod api;
pub mod error;
pub mod fixedpoint;
pub mod types;

pub use api::{DataResponse, ErrorDetail, ErrorResponse};
pub use error::{Error, Result};
pub use fixedpoint::{DecimalInterest, Money, DEFAULT_MINOR_DECIMALS, INTEREST_DECIMALS, INTEREST_SCALE};
pub use types::*;
