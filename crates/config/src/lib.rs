//! WellShare master configuration
//!
//! One YAML document drives the whole platform. Every section except
//! `platform` may be omitted and falls back to the defaults in
//! [`defaults`]; `${VAR}` placeholders are resolved from the environment
//! before parsing.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MasterConfig {
    pub platform: PlatformConfig,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub transfers: TransfersConfig,
    #[serde(default)]
    pub distribution: DistributionConfig,
    #[serde(default)]
    pub settlement: SettlementSection,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformConfig {
    pub name: String,
    #[serde(default)]
    pub environment: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Required when `backend` is `postgres`
    #[serde(default)]
    pub postgres: Option<PostgresConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default)]
    pub max_connections: Option<u32>,
}

impl PostgresConfig {
    pub fn max_connections(&self) -> u32 {
        self.max_connections.unwrap_or_else(default_max_connections)
    }
}

/// Transfer workflow retry policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransfersConfig {
    #[serde(default = "default_max_apply_attempts")]
    pub max_apply_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for TransfersConfig {
    fn default() -> Self {
        Self {
            max_apply_attempts: default_max_apply_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DistributionConfig {
    /// ISO 4217 code revenue is paid in
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Digits after the decimal point of the currency's minor unit
    #[serde(default = "default_minor_unit_decimals")]
    pub minor_unit_decimals: u32,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            minor_unit_decimals: default_minor_unit_decimals(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettlementSection {
    #[serde(default = "default_max_idempotency_key_length")]
    pub max_idempotency_key_length: usize,
    /// Payment verification service; payments are trusted when unset
    #[serde(default)]
    pub payments_url: Option<String>,
    /// Upper bound on one payment verification request
    #[serde(default = "default_payments_timeout_ms")]
    pub payments_timeout_ms: u64,
}

impl Default for SettlementSection {
    fn default() -> Self {
        Self {
            max_idempotency_key_length: default_max_idempotency_key_length(),
            payments_url: None,
            payments_timeout_ms: default_payments_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

/// Prometheus exporter
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub port: Option<u16>,
}

impl MetricsConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(default_metrics_port)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            port: None,
        }
    }
}
