//! Consensus operator console - entry point.
//!
//! Visualizes the trading agent's committee debate, account status,
//! candles and trade history, and lets the operator start/stop trading
//! and switch instruments.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Consensus trading agent operator console
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via CONSENSUS_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    consensus_channel::init_crypto();

    let args = Args::parse();

    consensus_telemetry::init_logging()?;

    info!("Starting Consensus console v{}", env!("CARGO_PKG_VERSION"));

    // Determine config path: CLI arg > CONSENSUS_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("CONSENSUS_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = consensus_console::AppConfig::load(&config_path)?;
    info!(
        backend_url = %config.backend_url,
        ws_url = %config.ws_url,
        "Configuration loaded"
    );

    let app = consensus_console::Application::new(config)?;
    app.run().await?;

    Ok(())
}
