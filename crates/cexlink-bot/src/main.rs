//! cexlink exchange connector - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// cexlink exchange connector
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via CEXLINK_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    cexlink_telemetry::init_logging()?;

    info!("Starting cexlink v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > CEXLINK_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("CEXLINK_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = cexlink_bot::AppConfig::from_file(&config_path)?;
    info!(variant = %config.variant, testnet = config.testnet, "Configuration loaded");

    let mut connector = cexlink_bot::Connector::new(config)?;
    connector.run().await?;

    Ok(())
}
