use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use webserver::app::{SettingsHandler, SettingsStore};
use webserver::config::{Cli, Config};
use webserver::server::listener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli)?;

    let settings = SettingsStore::load(cfg.settings_path.as_deref())?;
    let handler = Arc::new(SettingsHandler::new(settings));

    listener::run(&cfg.server, handler, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    })
    .await
}
