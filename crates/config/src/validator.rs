use crate::*;
use regex::Regex;
use thiserror::Error;
use url::Url;

/// Largest minor-unit precision money formatting supports
const MAX_MINOR_UNIT_DECIMALS: u32 = 8;

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("Platform name is required")]
    MissingPlatformName,

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("Storage: {message}")]
    InvalidStorage { message: String },

    #[error("Invalid currency code: {0}. Must be a three-letter ISO 4217 code (e.g., USD)")]
    InvalidCurrency(String),

    #[error("minor_unit_decimals must be at most {max}, got: {value}")]
    InvalidMinorUnitDecimals { value: u32, max: u32 },

    #[error("Invalid URL for {field}: {message}")]
    InvalidUrl { field: String, message: String },

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Port conflict: {first} and {second} both use {port}")]
    PortConflict { first: String, second: String, port: u16 },

    #[error("Environment variable '{var}' is missing or invalid: {message}")]
    InvalidEnvVar { var: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &MasterConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_platform(&config.platform, &mut report);
    validate_server(&config.server, &mut report);
    validate_storage(&config.storage, config.platform.environment, &mut report);
    validate_transfers(&config.transfers, &mut report);
    validate_distribution(&config.distribution, &mut report);
    validate_settlement(&config.settlement, &mut report);
    validate_logging(&config.logging, &mut report);
    validate_metrics(&config.metrics, &config.server, &mut report);

    report
}

fn validate_platform(platform: &PlatformConfig, report: &mut ValidationReport) {
    if platform.name.trim().is_empty() {
        report.add_error(ValidationError::MissingPlatformName);
    }
}

fn validate_server(server: &ServerSection, report: &mut ValidationReport) {
    if server.http_port == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "server.http_port".to_string(),
        });
    }
    if server.host.is_empty() {
        report.add_default("server.host", &default_host());
    }
}

fn validate_storage(storage: &StorageConfig, environment: Environment, report: &mut ValidationReport) {
    match storage.backend {
        StorageBackend::Memory => {
            if environment == Environment::Production {
                report.add_warning(
                    "storage.backend",
                    "In-memory storage loses all ledger state on restart",
                );
            }
        }
        StorageBackend::Postgres => match storage.postgres {
            Some(ref pg) => validate_postgres_config(pg, report),
            None => report.add_error(ValidationError::InvalidStorage {
                message: "Storage backend is 'postgres' but postgres configuration is missing"
                    .to_string(),
            }),
        },
    }
}

fn validate_postgres_config(pg: &PostgresConfig, report: &mut ValidationReport) {
    if pg.url.is_empty() || has_unresolved_env_vars(&pg.url) {
        report.add_error(ValidationError::InvalidEnvVar {
            var: "DATABASE_URL".to_string(),
            message: "postgres url is missing or unresolved".to_string(),
        });
    } else if let Err(e) = Url::parse(&pg.url) {
        report.add_error(ValidationError::InvalidUrl {
            field: "storage.postgres.url".to_string(),
            message: e.to_string(),
        });
    }

    match pg.max_connections {
        Some(0) => report.add_error(ValidationError::InvalidStorage {
            message: "max_connections must be a positive integer".to_string(),
        }),
        Some(_) => {}
        None => report.add_default(
            "storage.postgres.max_connections",
            &default_max_connections().to_string(),
        ),
    }
}

fn validate_transfers(transfers: &TransfersConfig, report: &mut ValidationReport) {
    if transfers.max_apply_attempts == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "transfers.max_apply_attempts".to_string(),
        });
    }
    if transfers.retry_backoff_ms == 0 && transfers.max_apply_attempts > 1 {
        report.add_warning(
            "transfers.retry_backoff_ms",
            "Retries without backoff will spin against a contended ledger",
        );
    }
}

fn validate_distribution(distribution: &DistributionConfig, report: &mut ValidationReport) {
    let currency_ok = Regex::new(r"^[A-Z]{3}$")
        .map(|re| re.is_match(&distribution.currency))
        .unwrap_or(false);
    if !currency_ok {
        report.add_error(ValidationError::InvalidCurrency(distribution.currency.clone()));
    }

    if distribution.minor_unit_decimals > MAX_MINOR_UNIT_DECIMALS {
        report.add_error(ValidationError::InvalidMinorUnitDecimals {
            value: distribution.minor_unit_decimals,
            max: MAX_MINOR_UNIT_DECIMALS,
        });
    }
}

fn validate_settlement(settlement: &SettlementSection, report: &mut ValidationReport) {
    if settlement.max_idempotency_key_length == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "settlement.max_idempotency_key_length".to_string(),
        });
    }
    if settlement.payments_timeout_ms == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "settlement.payments_timeout_ms".to_string(),
        });
    }

    match settlement.payments_url {
        Some(ref raw) => {
            if has_unresolved_env_vars(raw) {
                report.add_error(ValidationError::InvalidEnvVar {
                    var: "PAYMENTS_URL".to_string(),
                    message: "payments url is unresolved".to_string(),
                });
            } else if let Err(e) = Url::parse(raw) {
                report.add_error(ValidationError::InvalidUrl {
                    field: "settlement.payments_url".to_string(),
                    message: e.to_string(),
                });
            }
        }
        None => report.add_warning(
            "settlement.payments_url",
            "No payment service configured; earnest and funding payments are accepted unverified",
        ),
    }
}

fn validate_logging(logging: &LoggingConfig, report: &mut ValidationReport) {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&logging.level.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogLevel(logging.level.clone()));
    }
}

fn validate_metrics(metrics: &MetricsConfig, server: &ServerSection, report: &mut ValidationReport) {
    if !metrics.enabled {
        return;
    }
    if metrics.port.is_none() {
        report.add_default("metrics.port", &default_metrics_port().to_string());
    }
    let port = metrics.port();
    if port == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "metrics.port".to_string(),
        });
    } else if port == server.http_port {
        report.add_error(ValidationError::PortConflict {
            first: "server.http_port".to_string(),
            second: "metrics.port".to_string(),
            port,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn base() -> MasterConfig {
        generate_default_config()
    }

    #[test]
    fn test_empty_platform_name() {
        let mut config = base();
        config.platform.name = "  ".to_string();
        let report = validate_config(&config);
        assert_matches!(report.errors.as_slice(), [ValidationError::MissingPlatformName]);
    }

    #[test]
    fn test_postgres_requires_resolved_url() {
        let mut config = base();
        config.storage.backend = StorageBackend::Postgres;
        let report = validate_config(&config);
        assert!(!report.is_valid());
        assert_matches!(report.errors[0], ValidationError::InvalidEnvVar { .. });

        config.storage.postgres = None;
        let report = validate_config(&config);
        assert_matches!(report.errors[0], ValidationError::InvalidStorage { .. });
    }

    #[test]
    fn test_postgres_defaults_max_connections() {
        let mut config = base();
        config.storage.backend = StorageBackend::Postgres;
        config.storage.postgres = Some(PostgresConfig {
            url: "postgres://wellshare@localhost/wellshare".to_string(),
            max_connections: None,
        });
        let report = validate_config(&config);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report
            .defaults_applied
            .iter()
            .any(|d| d.field == "storage.postgres.max_connections" && d.value == "20"));
    }

    #[test]
    fn test_memory_backend_in_production_warns() {
        let mut config = base();
        config.platform.environment = Environment::Production;
        let report = validate_config(&config);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.field == "storage.backend"));
    }

    #[test]
    fn test_zero_apply_attempts_rejected() {
        let mut config = base();
        config.transfers.max_apply_attempts = 0;
        let report = validate_config(&config);
        assert_matches!(
            report.errors.as_slice(),
            [ValidationError::InvalidPositiveInteger { field }] if field == "transfers.max_apply_attempts"
        );
    }

    #[test]
    fn test_currency_and_decimals() {
        let mut config = base();
        config.distribution.currency = "usd".to_string();
        config.distribution.minor_unit_decimals = 12;
        let report = validate_config(&config);
        assert_eq!(report.errors.len(), 2);
        assert_matches!(report.errors[0], ValidationError::InvalidCurrency(_));
        assert_matches!(report.errors[1], ValidationError::InvalidMinorUnitDecimals { value: 12, .. });
    }

    #[test]
    fn test_payments_url_must_parse() {
        let mut config = base();
        config.settlement.payments_url = Some("not a url".to_string());
        let report = validate_config(&config);
        assert_matches!(report.errors.as_slice(), [ValidationError::InvalidUrl { .. }]);

        config.settlement.payments_url = Some("http://payments:7000".to_string());
        let report = validate_config(&config);
        assert!(report.is_valid());
        assert!(!report.warnings.iter().any(|w| w.field == "settlement.payments_url"));
    }

    #[test]
    fn test_zero_payments_timeout_rejected() {
        let mut config = base();
        config.settlement.payments_url = Some("http://payments:7000".to_string());
        config.settlement.payments_timeout_ms = 0;
        let report = validate_config(&config);
        assert_matches!(
            report.errors.as_slice(),
            [ValidationError::InvalidPositiveInteger { field }] if field == "settlement.payments_timeout_ms"
        );
    }

    #[test]
    fn test_metrics_port_conflict() {
        let mut config = base();
        config.metrics.port = Some(config.server.http_port);
        let report = validate_config(&config);
        assert_matches!(report.errors.as_slice(), [ValidationError::PortConflict { port: 8080, .. }]);
    }

    #[test]
    fn test_bad_log_level() {
        let mut config = base();
        config.logging.level = "loud".to_string();
        let report = validate_config(&config);
        assert_matches!(report.errors.as_slice(), [ValidationError::InvalidLogLevel(_)]);
    }
}
