//! Composition root: owns all shared state and wires the components
//! together.
//!
//! The registry, hub, and session store are plain values owned here and
//! injected into the intake handler, the coordinator, and the dashboard
//! server; there are no module-level singletons. Lifecycle is scoped to
//! the process: `new` builds state, `start` connects the two Telegram
//! clients, `shutdown` abandons whatever is in flight.

use crate::api;
use crate::bot::IntakeBot;
use crate::config::Config;
use crate::context::ContextRegistry;
use crate::coordinator::LargeFileCoordinator;
use crate::error::{Error, Result};
use crate::hub::DashboardHub;
use crate::session::SessionStore;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use teloxide::Bot;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Main service instance (cheap to share via `Arc`)
pub struct TelegramDownloader {
    config: Arc<Config>,
    hub: Arc<DashboardHub>,
    contexts: Arc<ContextRegistry>,
    sessions: Arc<SessionStore>,
    bot_active: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TelegramDownloader {
    /// Build the service state and ensure the download directory exists.
    /// No network connections are made here; see [`start`].
    ///
    /// [`start`]: TelegramDownloader::start
    pub async fn new(config: Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;
        tracing::info!(
            download_dir = %config.download.download_dir.display(),
            "Download directory ready"
        );

        Ok(Self {
            config: Arc::new(config),
            hub: Arc::new(DashboardHub::new()),
            contexts: Arc::new(ContextRegistry::new()),
            sessions: Arc::new(SessionStore::new()),
            bot_active: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Connect the Telegram clients and spawn their long-running tasks.
    ///
    /// Partial configuration degrades instead of failing: without MTProto
    /// credentials large files are rejected with an explanation, and
    /// without a bot token only the dashboard runs. Errors here are
    /// configuration-level only; client-session errors are logged and
    /// tolerated.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let config = &self.config;

        if !config.telegram.configured() {
            tracing::error!(
                "TELEGRAM_BOT_TOKEN not set; running the dashboard without a bot connection"
            );
            return Ok(());
        }
        let bot = Bot::new(config.telegram.bot_token.clone());

        let coordinator = if config.user_client.configured() {
            match config.telegram.bot_id() {
                Some(bot_chat_id) => {
                    match LargeFileCoordinator::connect(
                        config,
                        bot.clone(),
                        bot_chat_id,
                        self.contexts.clone(),
                        self.hub.clone(),
                    )
                    .await
                    {
                        Ok(coordinator) => {
                            let handle = coordinator.spawn();
                            self.tasks.lock().await.push(handle);
                            tracing::info!(
                                "MTProto client started — large file downloads enabled (up to 4 GB)"
                            );
                            Some(coordinator)
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to start MTProto client, continuing in Bot-API-only mode");
                            None
                        }
                    }
                }
                None => {
                    tracing::error!("Could not extract the bot id from TELEGRAM_BOT_TOKEN");
                    None
                }
            }
        } else {
            tracing::info!(
                "TELEGRAM_API_ID / TELEGRAM_API_HASH not set — running in Bot-API-only mode (20 MB limit applies)"
            );
            None
        };

        let intake = Arc::new(IntakeBot::new(
            bot,
            self.config.clone(),
            self.contexts.clone(),
            self.hub.clone(),
            coordinator,
        ));
        let handle = tokio::spawn(intake.run());
        self.tasks.lock().await.push(handle);
        self.bot_active.store(true, Ordering::Relaxed);

        Ok(())
    }

    /// Spawn the dashboard HTTP server in a background task.
    pub fn spawn_api_server(self: &Arc<Self>) -> JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();
        tokio::spawn(async move { api::start_api_server(downloader, config).await })
    }

    /// Abort the client tasks. In-flight transfers are abandoned and
    /// partially written files are left in place.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down");
        self.bot_active.store(false, Ordering::Relaxed);
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
    }

    /// Current configuration
    pub fn config(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// Dashboard event hub
    pub fn hub(&self) -> Arc<DashboardHub> {
        self.hub.clone()
    }

    /// Context registry shared between the two client connections
    pub fn contexts(&self) -> Arc<ContextRegistry> {
        self.contexts.clone()
    }

    /// Dashboard session store
    pub fn sessions(&self) -> Arc<SessionStore> {
        self.sessions.clone()
    }

    /// Directory all received files are written to
    pub fn download_dir(&self) -> &Path {
        &self.config.download.download_dir
    }

    /// Whether the bot connection is up (for the health endpoint)
    pub fn bot_active(&self) -> bool {
        self.bot_active.load(Ordering::Relaxed)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn new_creates_the_download_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.download.download_dir = temp_dir.path().join("downloads");

        let downloader = TelegramDownloader::new(config).await.unwrap();

        assert!(downloader.download_dir().is_dir());
        assert!(!downloader.bot_active());
        assert_eq!(downloader.hub().connection_count().await, 0);
    }

    #[tokio::test]
    async fn start_without_bot_token_leaves_bot_inactive() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.download.download_dir = temp_dir.path().join("downloads");

        let downloader = Arc::new(TelegramDownloader::new(config).await.unwrap());
        downloader.start().await.unwrap();

        assert!(
            !downloader.bot_active(),
            "no token means dashboard-only mode"
        );
    }

    #[tokio::test]
    async fn shutdown_is_safe_with_no_tasks() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.download.download_dir = temp_dir.path().join("downloads");

        let downloader = TelegramDownloader::new(config).await.unwrap();
        downloader.shutdown().await;
    }
}
