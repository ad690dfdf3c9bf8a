//! System handlers: dashboard page, health, OpenAPI spec.

use crate::api::AppState;
use axum::{Json, extract::State, response::IntoResponse, response::Response};
use serde_json::json;

/// GET / - Serve the dashboard page
pub async fn dashboard_page(State(state): State<AppState>) -> Response {
    crate::api::auth::serve_page(&state, "index.html").await
}

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "telegram_bot": state.downloader.bot_active(),
        "websocket_connections": state.downloader.hub().connection_count().await,
    }))
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
