//! Error types for telegram-dl
//!
//! One crate-level error enum covering both client connections (Bot API and
//! MTProto), the dashboard server, and file handling. Per-message failures
//! are logged at the handler boundary rather than propagated upward, so a
//! single bad transfer never takes down a listening loop.

use thiserror::Error;

/// Result type alias for telegram-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for telegram-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "bot_token")
        key: Option<String>,
    },

    /// Bot API request failed
    #[error("bot API error: {0}")]
    BotApi(#[from] teloxide::RequestError),

    /// Bot API file download failed
    #[error("bot API download error: {0}")]
    Download(#[from] teloxide::DownloadError),

    /// MTProto protocol or connection error
    #[error("MTProto error: {0}")]
    Mtproto(String),

    /// The remote service asked us to back off
    #[error("rate limited by Telegram: wait {seconds}s")]
    FloodWait {
        /// Seconds the service told us to wait before retrying
        seconds: u32,
    },

    /// The MTProto session file exists but is not signed in
    #[error("user session is not authorized: run the session-login tool first")]
    SessionNotAuthorized,

    /// A downloaded file is missing where the transfer said it would be
    #[error("transfer finished but file is missing: {0}")]
    TransferIncomplete(String),

    /// Filename failed validation (path traversal, separators, empty)
    #[error("invalid file name: {0}")]
    InvalidName(String),

    /// Requested file does not exist in the download directory
    #[error("file not found: {0}")]
    NotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Dashboard server error
    #[error("dashboard server error: {0}")]
    ApiServerError(String),
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_includes_message() {
        let err = Error::Config {
            message: "TELEGRAM_API_ID must be an integer".into(),
            key: Some("api_id".into()),
        };
        assert_eq!(
            err.to_string(),
            "configuration error: TELEGRAM_API_ID must be an integer"
        );
    }

    #[test]
    fn flood_wait_display_includes_seconds() {
        let err = Error::FloodWait { seconds: 37 };
        assert!(err.to_string().contains("37"));
    }

    #[test]
    fn io_error_converts_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn invalid_name_display_includes_offender() {
        let err = Error::InvalidName("../etc/passwd".into());
        assert!(err.to_string().contains("../etc/passwd"));
    }
}
