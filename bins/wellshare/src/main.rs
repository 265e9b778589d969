//! WellShare CLI and API server
//!
//! `start` wires the ledger, transfer workflow, distribution calculator and
//! settlement state machine onto one Axum router; the other commands work
//! offline against configuration or interest files.

mod offline;

use anyhow::{Context, Result};
use cli::{Cli, Commands, StorageChoice};
use config::{
    generate_default_config, load_config, save_config, validate_config, MasterConfig,
    StorageBackend, ValidationReport,
};
use observability::{init_logging, init_metrics, LogFormat};
use server::{
    validate_ports_available, HealthClient, HealthState, HttpServer, Server, ServerConfig,
    ShutdownController,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use distribution::DistributionService;
use ledger::{InMemoryLedgerStore, LedgerEvent, LedgerStore, OwnershipLedger, PostgresLedgerStore};
use settlement::{
    HttpPaymentVerifier, IdempotencyStore, InMemoryIdempotencyStore, InMemoryTransactionStore,
    PaymentVerifier, PostgresIdempotencyStore, PostgresTransactionStore, SettlementConfig,
    SettlementStateMachine, StaticPaymentVerifier, TransactionStore,
};
use transfers::{
    InMemoryTransferStore, PostgresTransferStore, TransferStore, TransferWorkflow, WorkflowConfig,
};

const HEALTH_PROBE_INTERVAL: Duration = Duration::from_secs(30);
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Start {
            config,
            http,
            storage,
        } => start_platform(config, http, storage).await,
        Commands::Validate { config } => {
            init_logging("wellshare", LogFormat::Compact, "warn")?;
            validate_command(config)
        }
        Commands::Init { output } => {
            init_logging("wellshare", LogFormat::Compact, "warn")?;
            init_command(output)
        }
        Commands::Distribute {
            interests,
            revenue,
            revenue_type,
            decimals,
            json,
        } => {
            init_logging("wellshare", LogFormat::Compact, "warn")?;
            distribute_command(&interests, &revenue, &revenue_type, decimals, json)
        }
    }
}

async fn start_platform<P: AsRef<Path>>(
    config_path: P,
    http_override: Option<u16>,
    storage_override: Option<StorageChoice>,
) -> Result<()> {
    let mut config = load_config(config_path.as_ref())?;

    if let Some(port) = http_override {
        config.server.http_port = port;
    }
    if let Some(choice) = storage_override {
        config.storage.backend = match choice {
            StorageChoice::Memory => StorageBackend::Memory,
            StorageChoice::Postgres => StorageBackend::Postgres,
        };
    }

    init_logging(
        &config.platform.name,
        log_format(config.logging.format),
        &config.logging.level,
    )?;
    info!(
        platform = %config.platform.name,
        environment = %config.platform.environment,
        "WellShare starting..."
    );

    let report = validate_config(&config);
    log_report(&report);
    if !report.is_valid() {
        anyhow::bail!("Cannot start WellShare due to configuration errors");
    }

    let mut server_config = ServerConfig::new(config.server.host.clone(), config.server.http_port);
    if config.metrics.enabled {
        server_config = server_config.with_metrics_port(config.metrics.port());
    }
    validate_ports_available(&server_config).await?;

    if config.metrics.enabled {
        init_metrics(config.metrics.port())?;
    }

    let shutdown = ShutdownController::with_signals();
    let health = Arc::new(HealthState::new(config.platform.name.clone()));
    let stores = Stores::connect(&config, &health, &shutdown).await?;

    let ledger = Arc::new(OwnershipLedger::new(stores.ledger));
    spawn_event_log(ledger.subscribe(), shutdown.child_token());

    let workflow = Arc::new(TransferWorkflow::new(
        stores.transfers,
        ledger.clone(),
        WorkflowConfig {
            max_apply_attempts: config.transfers.max_apply_attempts,
            retry_backoff: Duration::from_millis(config.transfers.retry_backoff_ms),
        },
    ));

    let distributions = Arc::new(DistributionService::new(
        ledger.clone(),
        config.distribution.minor_unit_decimals,
    ));

    let payments: Arc<dyn PaymentVerifier> = match config.settlement.payments_url {
        Some(ref url) => {
            let client = HealthClient::new(HEALTH_PROBE_TIMEOUT)?;
            health.spawn_http_probe(
                client,
                "payments",
                url.clone(),
                HEALTH_PROBE_INTERVAL,
                shutdown.child_token(),
            );
            info!(url = %url, "Verifying payments against remote service");
            let timeout = Duration::from_millis(config.settlement.payments_timeout_ms);
            Arc::new(HttpPaymentVerifier::new(url, timeout)?)
        }
        None => {
            warn!("No payment service configured; payments are accepted unverified");
            Arc::new(StaticPaymentVerifier::new())
        }
    };

    let settlement = Arc::new(SettlementStateMachine::new(
        stores.transactions,
        stores.keys,
        payments,
        workflow.clone(),
        SettlementConfig {
            max_idempotency_key_length: config.settlement.max_idempotency_key_length,
        },
    ));

    let api = axum::Router::new()
        .merge(ledger::api::create_router(ledger))
        .merge(transfers::api::create_router(workflow))
        .merge(distribution::api::create_router(distributions))
        .merge(settlement::api::create_router(settlement));

    let server = HttpServer::with_health(server_config, api, health);
    info!(
        host = %config.server.host,
        http_port = config.server.http_port,
        backend = %config.storage.backend,
        "Serving WellShare API"
    );

    server.run(shutdown.child_token()).await?;
    shutdown.shutdown();

    info!("WellShare stopped");
    Ok(())
}

/// Persistence for every engine, chosen by `storage.backend`
struct Stores {
    ledger: Arc<dyn LedgerStore>,
    transfers: Arc<dyn TransferStore>,
    transactions: Arc<dyn TransactionStore>,
    keys: Arc<dyn IdempotencyStore>,
}

impl Stores {
    fn in_memory() -> Self {
        Self {
            ledger: Arc::new(InMemoryLedgerStore::new()),
            transfers: Arc::new(InMemoryTransferStore::new()),
            transactions: Arc::new(InMemoryTransactionStore::new()),
            keys: Arc::new(InMemoryIdempotencyStore::new()),
        }
    }

    async fn connect(
        config: &MasterConfig,
        health: &HealthState,
        shutdown: &ShutdownController,
    ) -> Result<Self> {
        let pg = match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                return Ok(Self::in_memory());
            }
            StorageBackend::Postgres => config
                .storage
                .postgres
                .as_ref()
                .context("storage.postgres is required for the postgres backend")?,
        };

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(pg.max_connections())
            .connect(&pg.url)
            .await
            .context("Failed to connect to PostgreSQL")?;
        info!(max_connections = pg.max_connections(), "Connected to PostgreSQL");

        let ledger = PostgresLedgerStore::new(pool.clone());
        ledger.ensure_schema().await?;
        let transfers = PostgresTransferStore::new(pool.clone());
        transfers.ensure_schema().await?;
        let transactions = PostgresTransactionStore::new(pool.clone());
        transactions.ensure_schema().await?;
        let keys = PostgresIdempotencyStore::new(pool.clone());
        debug!("Database schema ready");

        spawn_postgres_probe(pool, health.clone(), shutdown.child_token());

        Ok(Self {
            ledger: Arc::new(ledger),
            transfers: Arc::new(transfers),
            transactions: Arc::new(transactions),
            keys: Arc::new(keys),
        })
    }
}

fn spawn_postgres_probe(pool: sqlx::PgPool, health: HealthState, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HEALTH_PROBE_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let start = std::time::Instant::now();
                    let result = sqlx::query("SELECT 1").execute(&pool).await;
                    if let Err(ref e) = result {
                        warn!(error = %e, "PostgreSQL health check failed");
                    }
                    health
                        .update_component(server::ComponentStatus {
                            component: "postgres".to_string(),
                            address: "storage.postgres".to_string(),
                            healthy: result.is_ok(),
                            latency_ms: Some(start.elapsed().as_millis() as u64),
                            error: result.err().map(|e| e.to_string()),
                        })
                        .await;
                }
            }
        }
    });
}

/// Trace ledger changes so downstream caches can be correlated with them
fn spawn_event_log(
    mut events: tokio::sync::broadcast::Receiver<LedgerEvent>,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                received = events.recv() => match received {
                    Ok(event) => debug!(
                        division_order_id = %event.division_order_id(),
                        version = event.version(),
                        event = ?event,
                        "Ledger changed"
                    ),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Ledger event log lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });
}

fn log_format(format: config::LogFormat) -> LogFormat {
    match format {
        config::LogFormat::Pretty => LogFormat::Pretty,
        config::LogFormat::Json => LogFormat::Json,
        config::LogFormat::Compact => LogFormat::Compact,
    }
}

fn log_report(report: &ValidationReport) {
    for default in &report.defaults_applied {
        debug!(field = %default.field, value = %default.value, "Default applied");
    }
    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }
    if !report.is_valid() {
        error!(error_count = report.errors.len(), "Configuration validation failed");
        for err in &report.errors {
            error!("{}", err);
        }
    }
}

fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = load_config(&config_path)?;
    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Platform: {}", config.platform.name);
    println!("Environment: {}", config.platform.environment);
    println!("Storage: {}", config.storage.backend);
    println!(
        "Currency: {} ({} minor-unit decimals)",
        config.distribution.currency, config.distribution.minor_unit_decimals
    );
    println!(
        "Payments: {}",
        config
            .settlement
            .payments_url
            .as_deref()
            .unwrap_or("unverified")
    );

    Ok(())
}

fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    let config = generate_default_config();

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Set storage.backend to postgres and export DATABASE_URL for durable ledgers");
    println!("  2. Set settlement.payments_url to verify earnest and funding payments");
    println!(
        "  3. Run 'wellshare validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  4. Run 'wellshare start --config {:?}' to start the API",
        output_path
    );

    Ok(())
}

fn distribute_command(
    interests: &Path,
    revenue: &str,
    revenue_type: &str,
    decimals: u32,
    json: bool,
) -> Result<()> {
    let distribution = offline::preview(interests, revenue, revenue_type, decimals)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&distribution)?);
    } else {
        print!("{}", offline::render_table(&distribution, decimals));
    }
    Ok(())
}
