use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MasterConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    let substituted = substitution::substitute_env_vars(&content)?;
    debug!("Environment variable substitution completed");

    let config: MasterConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!(
        platform = %config.platform.name,
        environment = %config.platform.environment,
        backend = %config.storage.backend,
        "Configuration loaded successfully"
    );
    Ok(config)
}

#[instrument]
pub fn generate_default_config() -> MasterConfig {
    MasterConfig {
        platform: PlatformConfig {
            name: "WellShare".to_string(),
            environment: Environment::Development,
        },
        server: ServerSection::default(),
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            postgres: Some(PostgresConfig {
                url: "${DATABASE_URL}".to_string(),
                max_connections: Some(default_max_connections()),
            }),
        },
        transfers: TransfersConfig::default(),
        distribution: DistributionConfig::default(),
        settlement: SettlementSection::default(),
        logging: LoggingConfig::default(),
        metrics: MetricsConfig {
            enabled: true,
            port: Some(default_metrics_port()),
        },
    }
}

#[instrument(skip(config))]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &MasterConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("wellshare-{}-{}.yaml", name, std::process::id()))
    }

    #[test]
    fn test_default_config_is_valid() {
        let report = validate_config(&generate_default_config());
        assert!(report.is_valid(), "{:?}", report.errors);
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch_path("save-load");
        let mut config = generate_default_config();
        config.platform.name = "Eagle Ford Minerals".to_string();
        config.transfers.max_apply_attempts = 3;

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.platform.name, "Eagle Ford Minerals");
        assert_eq!(loaded.transfers.max_apply_attempts, 3);
        assert_eq!(loaded.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_load_substitutes_environment() {
        let path = scratch_path("env");
        std::env::set_var("WELLSHARE_TEST_PLATFORM", "Bakken Interests");
        std::fs::write(&path, "platform:\n  name: ${WELLSHARE_TEST_PLATFORM}\n").unwrap();

        let loaded = load_config(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.platform.name, "Bakken Interests");
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(load_config("/nonexistent/wellshare.yaml").is_err());
    }
}
