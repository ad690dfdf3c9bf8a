//! Session-cookie authentication for the dashboard.
//!
//! Login exchanges the configured credentials for an opaque bearer token
//! stored server-side and handed to the browser as an http-only cookie.
//! The middleware gates every route except the public set; browsers are
//! redirected to the login page, while the WebSocket endpoint gets a plain
//! 403 (a redirect is useless mid-upgrade).

use crate::api::AppState;
use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session_token";

/// Session lifetime: seven days
const SESSION_MAX_AGE: time::Duration = time::Duration::days(7);

/// Paths reachable without a session
const PUBLIC_PATHS: &[&str] = &["/login", "/logout", "/health", "/favicon.ico"];

/// Credentials submitted by the login form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Dashboard username
    pub username: String,
    /// Dashboard password
    pub password: String,
}

/// Middleware gating all non-public routes behind a valid session cookie.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();

    if PUBLIC_PATHS.contains(&path) || path.starts_with("/static") {
        return next.run(request).await;
    }

    let authorized = match jar.get(SESSION_COOKIE) {
        Some(cookie) => state
            .downloader
            .sessions()
            .validate(cookie.value())
            .await
            .is_some(),
        None => false,
    };
    if authorized {
        return next.run(request).await;
    }

    if path == "/ws" {
        return (StatusCode::FORBIDDEN, "Unauthorized").into_response();
    }
    found("/login")
}

/// GET /login - Serve the login page
pub async fn login_page(State(state): State<AppState>) -> Response {
    serve_page(&state, "login.html").await
}

/// POST /login - Validate credentials and set the session cookie
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    axum::Form(form): axum::Form<LoginForm>,
) -> Response {
    let dashboard = &state.config.dashboard;
    let valid = form.username == dashboard.username
        && constant_time_eq(form.password.as_bytes(), dashboard.password.as_bytes());
    if !valid {
        tracing::warn!(username = %form.username, "Failed dashboard login");
        return found("/login?error=1");
    }

    let token = state.downloader.sessions().create(form.username.clone()).await;
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(SESSION_MAX_AGE)
        .build();
    tracing::info!(username = %form.username, "Dashboard login");
    (jar.add(cookie), found("/")).into_response()
}

/// GET /logout - Destroy the session and clear the cookie
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.downloader.sessions().remove(cookie.value()).await;
    }
    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");
    (jar.remove(removal), found("/login")).into_response()
}

/// 302 Found redirect. `axum::response::Redirect` issues 303/307; the
/// dashboard keeps the classic 302 for form posts and page gates.
pub(crate) fn found(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}

/// Serve a page from the static assets directory.
pub(crate) async fn serve_page(state: &AppState, name: &str) -> Response {
    let path = state.config.dashboard.static_dir.join(name);
    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => Html(contents).into_response(),
        Err(e) => {
            tracing::error!(page = name, error = %e, "Static page missing");
            (StatusCode::NOT_FOUND, "page not found").into_response()
        }
    }
}

/// Constant-time byte comparison to prevent timing side-channel attacks.
/// Always compares all bytes regardless of where the first mismatch occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_equal_inputs() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn constant_time_eq_rejects_unequal_inputs() {
        assert!(!constant_time_eq(b"secret", b"secret "));
        assert!(!constant_time_eq(b"secret", b"sEcret"));
        assert!(!constant_time_eq(b"short", b"much longer input"));
    }
}
