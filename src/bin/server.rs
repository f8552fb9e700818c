//! Search API server binary.
//!
//! Reads configuration from the path in `ASTROBIO_CONFIG` (or the default
//! config path), applies environment overrides and serves until Ctrl-C.

use std::path::PathBuf;

use astrobio::{AppConfig, AppState, SearchServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = std::env::var_os("ASTROBIO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_config_path);

    let mut config = AppConfig::load_or_default(&path)?;
    config.apply_env_overrides();
    config.validate()?;

    let state = AppState::from_config(&config).await?;
    let server = SearchServer::start(state, &config.server).await?;
    tracing::info!(
        addr = %server.addr(),
        sources = config.sources.iter().filter(|s| s.enabled).count(),
        auth = config.server.api_key.is_some(),
        "astrobio-server started"
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to listen for shutdown signal: {e}"))?;

    server.shutdown();
    tracing::info!("astrobio-server shut down cleanly");
    Ok(())
}
