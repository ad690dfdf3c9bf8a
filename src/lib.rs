//! # telegram-dl
//!
//! Telegram file-intake server with a live web dashboard.
//!
//! Two client connections work the same remote service: a Bot API client
//! receives files and downloads anything within the API's 20 MiB ceiling,
//! and an MTProto user client captures everything larger by watching the
//! mirrored copies of those messages on the user account. A context
//! registry hands attribution metadata between the two, tolerating either
//! side observing the message first. Received files land in a flat
//! download directory served by an axum dashboard with a WebSocket event
//! feed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use telegram_dl::{Config, TelegramDownloader, run_with_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!     let downloader = Arc::new(TelegramDownloader::new(config).await?);
//!
//!     downloader.start().await?;
//!     downloader.spawn_api_server();
//!
//!     run_with_shutdown(downloader).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Dashboard HTTP server module
pub mod api;
/// Bot API intake handler
pub mod bot;
/// Configuration types
pub mod config;
/// Handoff registry between the two client connections
pub mod context;
/// MTProto large-file coordinator
pub mod coordinator;
/// Cross-connection media id correlation
pub mod correlation;
/// Composition root
pub mod downloader;
/// Error types
pub mod error;
/// Dashboard event fan-out hub
pub mod hub;
/// Progress coalescing
pub mod progress;
/// Dashboard session store
pub mod session;
/// File store operations
pub mod storage;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, DashboardConfig, DownloadConfig, TelegramConfig, UserClientConfig};
pub use context::ContextRegistry;
pub use downloader::TelegramDownloader;
pub use error::{Error, Result};
pub use hub::DashboardHub;
pub use types::{BOT_API_MAX_FILE_SIZE, DownloadContext, Event, FileEntry, FileKind};

use std::sync::Arc;

/// Run until a termination signal arrives, then shut the service down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(downloader: Arc<TelegramDownloader>) {
    wait_for_signal().await;
    downloader.shutdown().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
