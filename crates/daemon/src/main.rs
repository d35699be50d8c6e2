//! Treestatus dashboard entry point.
//!
//! Loads configuration, picks the Treestatus backend, starts the web server
//! and handles graceful shutdown.

mod signals;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use treestatus_core::api::{HttpStatusApi, StatusApi, StubStatusApi};
use treestatus_core::config::{ApiMode, AppConfig};
use treestatus_web::WebServer;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Treestatus dashboard server.
#[derive(Parser, Debug)]
#[command(
    name = "treestatus-ui",
    version,
    about = "Server-rendered Treestatus dashboard"
)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Serve in-memory sample data instead of calling the remote API.
    #[arg(long)]
    stub: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load, resolve and validate configuration
    let config = AppConfig::load_and_resolve(&args.config, args.stub.then_some(ApiMode::Stub))
        .context("failed to load configuration")?;

    // Initialize tracing
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.server.log_level);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    info!("========================================");
    info!("  Treestatus UI v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Config file   : {}", args.config.display());
    info!("API mode      : {:?}", config.api.mode);
    if config.api.mode == ApiMode::Remote {
        info!("API URL       : {}", config.api.url);
        info!("API token     : {}", if config.api.token.is_some() { "set" } else { "not set" });
    }
    info!("Listen        : {}", config.server.listen);
    info!("Log level     : {}", log_level);
    info!("========================================");

    let api: Arc<dyn StatusApi> = match config.api.mode {
        ApiMode::Remote => Arc::new(
            HttpStatusApi::from_config(&config.api).context("failed to build API client")?,
        ),
        ApiMode::Stub => Arc::new(StubStatusApi::seeded()),
    };

    let listen_addr = config.server.listen.clone();
    WebServer::new(config, api)
        .start(&listen_addr, signals::wait_for_shutdown())
        .await
        .context("web server error")?;

    info!("Treestatus UI stopped.");
    Ok(())
}
