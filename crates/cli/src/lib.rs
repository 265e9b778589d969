use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wellshare")]
#[command(about = "WellShare - fractional mineral interest ledger and settlement engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server
    Start {
        /// Path to the configuration file
        #[arg(short, long, default_value = "config/wellshare.yaml", env = "WELLSHARE_CONFIG")]
        config: PathBuf,

        /// Override HTTP port
        #[arg(long)]
        http: Option<u16>,

        /// Override the storage backend
        #[arg(long, value_enum)]
        storage: Option<StorageChoice>,
    },

    /// Validate configuration without starting the server
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "config/wellshare.yaml", env = "WELLSHARE_CONFIG")]
        config: PathBuf,
    },

    /// Write a configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "wellshare.yaml")]
        output: PathBuf,
    },

    /// Preview a revenue distribution offline
    Distribute {
        /// YAML list of owners, each with `owner` and `decimal_interest`
        #[arg(short, long)]
        interests: PathBuf,

        /// Total revenue as a decimal amount (e.g., 100.01)
        #[arg(short, long)]
        revenue: String,

        /// Revenue stream being paid out
        #[arg(long, default_value = "oil")]
        revenue_type: String,

        /// Digits in the currency's minor unit
        #[arg(long, default_value_t = 2)]
        decimals: u32,

        /// Print the distribution as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageChoice {
    /// Process-local maps, lost on exit
    Memory,
    /// PostgreSQL via `storage.postgres.url`
    Postgres,
}

impl StorageChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageChoice::Memory => "memory",
            StorageChoice::Postgres => "postgres",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_overrides() {
        let cli = Cli::try_parse_from([
            "wellshare", "start", "--config", "prod.yaml", "--http", "9001", "--storage", "postgres",
        ])
        .unwrap();
        match cli.command {
            Commands::Start { config, http, storage } => {
                assert_eq!(config, PathBuf::from("prod.yaml"));
                assert_eq!(http, Some(9001));
                assert_eq!(storage, Some(StorageChoice::Postgres));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_distribute_defaults() {
        let cli = Cli::try_parse_from([
            "wellshare", "distribute", "--interests", "owners.yaml", "--revenue", "100.01",
        ])
        .unwrap();
        match cli.command {
            Commands::Distribute { revenue, revenue_type, decimals, json, .. } => {
                assert_eq!(revenue, "100.01");
                assert_eq!(revenue_type, "oil");
                assert_eq!(decimals, 2);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_distribute_requires_revenue() {
        assert!(Cli::try_parse_from(["wellshare", "distribute", "--interests", "owners.yaml"]).is_err());
    }
}
