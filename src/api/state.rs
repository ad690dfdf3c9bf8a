//! Application state for the dashboard server

use crate::{Config, TelegramDownloader};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request (cheap Arc clones); provides access to the service
/// instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The main TelegramDownloader instance
    pub downloader: Arc<TelegramDownloader>,

    /// Configuration (read access)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<TelegramDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
