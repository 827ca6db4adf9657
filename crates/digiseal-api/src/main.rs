//! DigiSeal API server binary.

use anyhow::{Context, Result};
use digiseal_api::{ApiService, ServerConfig};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;

    let config = ServerConfig::load().context("failed to load configuration")?;
    info!(
        addr = %config.http_addr(),
        node = %config.blockchain.url,
        "Starting DigiSeal API"
    );

    let service = ApiService::from_config(config).context("failed to initialise service")?;
    service.start().await?;

    Ok(())
}
