//! Configuration types for telegram-dl

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use utoipa::ToSchema;

/// Bot API connection settings
///
/// Groups settings for the primary Telegram bot connection.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TelegramConfig {
    /// Bot token issued by @BotFather (empty = bot disabled)
    #[serde(default)]
    pub bot_token: String,

    /// Chat ids allowed to send files (empty = allow all)
    #[serde(default)]
    pub allowed_chat_ids: Vec<i64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allowed_chat_ids: Vec::new(),
        }
    }
}

impl TelegramConfig {
    /// Whether a bot token has been supplied
    pub fn configured(&self) -> bool {
        !self.bot_token.is_empty() && self.bot_token != "your_bot_token_here"
    }

    /// Numeric bot account id, parsed from the token prefix.
    ///
    /// Bot tokens have the shape `<bot_id>:<secret>`. The id is needed by
    /// the user client to filter mirrored messages to the right chat.
    pub fn bot_id(&self) -> Option<i64> {
        self.bot_token.split(':').next()?.parse().ok()
    }
}

/// MTProto user client settings
///
/// When api_id/api_hash are absent the server runs in Bot-API-only mode
/// and large files are rejected with an explanation.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UserClientConfig {
    /// Telegram application id from my.telegram.org
    #[serde(default)]
    pub api_id: Option<i32>,

    /// Telegram application hash from my.telegram.org
    #[serde(default)]
    pub api_hash: Option<String>,

    /// Path of the persisted MTProto session (default: "telegram-dl.session")
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
}

impl Default for UserClientConfig {
    fn default() -> Self {
        Self {
            api_id: None,
            api_hash: None,
            session_file: default_session_file(),
        }
    }
}

impl UserClientConfig {
    /// Whether enough credentials are present to attempt a connection
    pub fn configured(&self) -> bool {
        self.api_id.is_some() && self.api_hash.as_deref().is_some_and(|h| !h.is_empty())
    }
}

/// Download storage settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Flat directory all received files are written to (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
        }
    }
}

/// Dashboard HTTP server settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardConfig {
    /// Address the dashboard server binds to (default: 0.0.0.0:8000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Dashboard login username (default: "admin")
    #[serde(default = "default_dashboard_username")]
    pub username: String,

    /// Dashboard login password (default: "changeme")
    #[serde(default = "default_dashboard_password")]
    pub password: String,

    /// Directory of static assets (default: "./static")
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Enable CORS middleware (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins, "*" for any (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Serve interactive Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            username: default_dashboard_username(),
            password: default_dashboard_password(),
            static_dir: default_static_dir(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: false,
        }
    }
}

/// Main configuration for telegram-dl
///
/// Fields are organized into logical sub-configs:
/// - [`telegram`](TelegramConfig) — Bot API token and allow-list
/// - [`user_client`](UserClientConfig) — MTProto credentials and session
/// - [`download`](DownloadConfig) — storage directory
/// - [`dashboard`](DashboardConfig) — HTTP server, auth, CORS
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Bot API connection settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// MTProto user client settings
    #[serde(default)]
    pub user_client: UserClientConfig,

    /// Download storage settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Dashboard HTTP server settings
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Build a configuration from environment variables.
    ///
    /// All settings are optional and fall back to defaults; malformed
    /// values are logged and treated as absent so a typo in one variable
    /// never prevents startup. Recognized variables:
    ///
    /// - `TELEGRAM_BOT_TOKEN`, `ALLOWED_CHAT_IDS` (comma-separated ids)
    /// - `TELEGRAM_API_ID`, `TELEGRAM_API_HASH`, `TELEGRAM_SESSION_FILE`
    /// - `DOWNLOADS_DIR`
    /// - `HOST`, `PORT`, `DASHBOARD_USERNAME`, `DASHBOARD_PASSWORD`,
    ///   `STATIC_DIR`, `SWAGGER_UI`
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            config.telegram.bot_token = token;
        }
        if let Ok(raw) = std::env::var("ALLOWED_CHAT_IDS")
            && !raw.is_empty()
        {
            match parse_allowed_chat_ids(&raw) {
                Some(ids) => {
                    tracing::info!(allowed_chat_ids = ?ids, "Chat allow-list configured");
                    config.telegram.allowed_chat_ids = ids;
                }
                None => {
                    tracing::warn!("Invalid ALLOWED_CHAT_IDS format, allowing all chats");
                }
            }
        }

        if let Ok(raw) = std::env::var("TELEGRAM_API_ID") {
            match raw.parse::<i32>() {
                Ok(id) => config.user_client.api_id = Some(id),
                Err(_) => tracing::warn!("TELEGRAM_API_ID must be an integer, ignoring"),
            }
        }
        if let Ok(hash) = std::env::var("TELEGRAM_API_HASH")
            && !hash.is_empty()
        {
            config.user_client.api_hash = Some(hash);
        }
        if let Ok(path) = std::env::var("TELEGRAM_SESSION_FILE") {
            config.user_client.session_file = PathBuf::from(path);
        }

        if let Ok(dir) = std::env::var("DOWNLOADS_DIR") {
            config.download.download_dir = PathBuf::from(dir);
        }

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);
        match format!("{host}:{port}").parse() {
            Ok(addr) => config.dashboard.bind_address = addr,
            Err(_) => tracing::warn!(%host, port, "Invalid HOST/PORT, using default bind address"),
        }

        if let Ok(user) = std::env::var("DASHBOARD_USERNAME") {
            config.dashboard.username = user;
        }
        if let Ok(pass) = std::env::var("DASHBOARD_PASSWORD") {
            config.dashboard.password = pass;
        }
        if let Ok(dir) = std::env::var("STATIC_DIR") {
            config.dashboard.static_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var("SWAGGER_UI") {
            config.dashboard.swagger_ui = raw.eq_ignore_ascii_case("true") || raw == "1";
        }

        config
    }
}

/// Parse a comma-separated chat id list. Returns None when any entry is
/// not an integer, in which case the caller falls back to allow-all.
pub(crate) fn parse_allowed_chat_ids(raw: &str) -> Option<Vec<i64>> {
    raw.split(',')
        .map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

fn default_session_file() -> PathBuf {
    PathBuf::from("telegram-dl.session")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_dashboard_username() -> String {
    "admin".to_string()
}

fn default_dashboard_password() -> String {
    "changeme".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./static")
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
