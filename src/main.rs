//! Server binary: load configuration, wire the service, run until a
//! termination signal.

use std::sync::Arc;
use telegram_dl::{Config, TelegramDownloader, run_with_shutdown};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env before reading any configuration.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    if !config.telegram.configured() {
        tracing::error!("TELEGRAM_BOT_TOKEN not set! Please configure the .env file.");
    }
    let bind_address = config.dashboard.bind_address;

    let downloader = Arc::new(TelegramDownloader::new(config).await?);
    downloader.start().await?;

    let api_handle = downloader.spawn_api_server();
    tracing::info!(%bind_address, "Dashboard available");

    tokio::select! {
        _ = run_with_shutdown(downloader.clone()) => {}
        result = api_handle => {
            match result {
                Ok(Err(e)) => tracing::error!(error = %e, "Dashboard server exited with error"),
                Err(e) => tracing::error!(error = %e, "Dashboard server task panicked"),
                Ok(Ok(())) => {}
            }
            downloader.shutdown().await;
        }
    }

    Ok(())
}
