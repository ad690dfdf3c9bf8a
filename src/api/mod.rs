//! Dashboard HTTP server module
//!
//! Serves the authenticated web dashboard: file listing and management,
//! byte-range streaming for previews, static assets, and the WebSocket
//! event feed.

use crate::{Config, TelegramDownloader};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod ws;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the dashboard router with all route definitions
///
/// # Routes
///
/// ## Pages and auth (session cookie)
/// - `GET /` - Dashboard page
/// - `GET /login` - Login page
/// - `POST /login` - Credentials check, sets the session cookie
/// - `GET /logout` - Destroy the session
///
/// ## Files
/// - `GET /downloads` - List stored files
/// - `GET /downloads/:name` - Fetch a file as an attachment
/// - `DELETE /downloads/:name` - Delete a file
/// - `GET /stream/:name` - Inline streaming with Range support
///
/// ## Realtime
/// - `GET /ws` - WebSocket event feed (ping/pong + server push)
///
/// ## System
/// - `GET /health` - Health check (public)
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive documentation (if enabled)
/// - `/static/*` - Static assets (public)
pub fn create_router(downloader: Arc<TelegramDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, config.clone());

    let router = Router::new()
        .route("/", get(routes::dashboard_page))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/health", get(routes::health_check))
        .route("/downloads", get(routes::list_downloads))
        .route("/downloads/:name", get(routes::fetch_download))
        .route("/downloads/:name", delete(routes::delete_download))
        .route("/stream/:name", get(routes::stream_download))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/ws", get(ws::websocket_endpoint))
        .nest_service("/static", ServeDir::new(&config.dashboard.static_dir));

    // Merge Swagger UI routes if enabled in config (before applying state).
    // SwaggerUi serves its own copy of the spec under /api-docs to avoid
    // clashing with the /openapi.json route above.
    let router = if config.dashboard.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state.clone());

    // Session gate goes on after state so it wraps every route, including
    // the merged Swagger UI.
    let router = router.layer(middleware::from_fn_with_state(
        state,
        auth::require_session,
    ));

    // Apply CORS middleware if enabled in config
    if config.dashboard.cors_enabled {
        let cors = build_cors_layer(&config.dashboard.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// Supports "*" for any origin; an empty list also allows any origin,
/// which is the default for local development.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the dashboard server on the configured bind address.
///
/// Binds a TCP listener and serves the router until shutdown.
pub async fn start_api_server(
    downloader: Arc<TelegramDownloader>,
    config: Arc<Config>,
) -> crate::Result<()> {
    let bind_address = config.dashboard.bind_address;

    tracing::info!(address = %bind_address, "Starting dashboard server");

    let app = create_router(downloader, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "Dashboard available");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("Dashboard server stopped");
    Ok(())
}
