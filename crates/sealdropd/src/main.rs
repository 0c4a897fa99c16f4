//! sealdropd: the sealdrop share server daemon
//!
//! Usage:
//!   sealdropd [--config /etc/sealdrop/config.toml]
//!
//! Stores ciphertext blobs and access-policy records; never sees plaintext
//! or keys. See `sealdrop` (the CLI) for the client side.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use sealdrop_core::config::SealdropConfig;
use sealdrop_share::{LifecycleGate, RecordStore};
use sealdropd::{http, metrics};

#[derive(Parser, Debug)]
#[command(name = "sealdropd", version, about = "sealdrop share server daemon")]
struct Cli {
    /// Path to sealdrop.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "SEALDROP_CONFIG",
        default_value = "/etc/sealdrop/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SEALDROP_LOG", default_value = "info")]
    log: String,

    /// Log format (json, text)
    #[arg(long, env = "SEALDROP_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log, &cli.log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "sealdropd starting"
    );

    let config = load_config(&cli.config).await?;
    run(config).await
}

async fn run(config: SealdropConfig) -> Result<()> {
    // Build the blob operator and verify connectivity
    let op = sealdrop_store::build_operator(&config.storage)?;
    match sealdrop_store::check_health(&op).await {
        Ok(()) => info!(backend = %config.storage.backend, "blob storage: connected"),
        Err(e) => warn!(backend = %config.storage.backend, "blob storage: {e}"),
    }

    // Open the record database. With the memory blob backend everything is
    // ephemeral, so records stay in memory too — a persisted record must
    // never outlive its ciphertext.
    let records = if config.storage.backend == "memory" {
        info!("memory storage backend: records are ephemeral");
        Arc::new(RecordStore::in_memory())
    } else {
        info!(db = %config.records.db_path.display(), "record database: open");
        Arc::new(RecordStore::open(&config.records.db_path)?)
    };

    let gate = Arc::new(LifecycleGate::new(records.clone(), op.clone()));
    let app_metrics = Arc::new(metrics::AppMetrics::new());

    // Metrics + health endpoints on their own address
    if let Some(addr) = config.server.metrics_addr.clone() {
        let state = metrics::HealthState {
            metrics: app_metrics.clone(),
            operator: op.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = metrics::serve(addr, state).await {
                error!("metrics server failed: {e}");
            }
        });
    }

    let state = http::AppState {
        records,
        op,
        gate,
        metrics: app_metrics,
    };
    let app = http::router(state, config.server.max_payload_bytes());

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .map_err(|e| anyhow::anyhow!("share API bind {}: {e}", config.server.listen))?;

    info!(addr = %config.server.listen, "share API: listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("share API server: {e}"))
}

async fn load_config(path: &PathBuf) -> Result<SealdropConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))
    } else {
        warn!("config file not found: {}  (using defaults)", path.display());
        Ok(SealdropConfig::default())
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }
}
