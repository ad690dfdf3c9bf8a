//! In-memory dashboard session store.
//!
//! Tokens are opaque bearer values mapped to the logged-in username. The
//! store lives for the process lifetime only; restarting the server logs
//! everyone out, which is the documented behavior.

use rand::Rng;
use rand::distributions::Alphanumeric;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Length of generated session tokens
const TOKEN_LENGTH: usize = 48;

/// Token → username table guarding the dashboard
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, String>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for a username and return its token.
    pub async fn create(&self, username: impl Into<String>) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        self.sessions
            .lock()
            .await
            .insert(token.clone(), username.into());
        token
    }

    /// Username for a token, if the session exists.
    pub async fn validate(&self, token: &str) -> Option<String> {
        self.sessions.lock().await.get(token).cloned()
    }

    /// Destroy a session. Unknown tokens are ignored.
    pub async fn remove(&self, token: &str) {
        self.sessions.lock().await.remove(token);
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether no sessions exist
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn created_session_validates() {
        let store = SessionStore::new();
        let token = store.create("admin").await;

        assert_eq!(store.validate(&token).await.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let store = SessionStore::new();
        assert!(store.validate("bogus").await.is_none());
    }

    #[tokio::test]
    async fn removed_session_no_longer_validates() {
        let store = SessionStore::new();
        let token = store.create("admin").await;

        store.remove(&token).await;
        assert!(store.validate(&token).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn tokens_are_unique_and_opaque() {
        let store = SessionStore::new();
        let a = store.create("admin").await;
        let b = store.create("admin").await;

        assert_ne!(a, b);
        assert_eq!(a.len(), TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(store.len().await, 2, "one user may hold several sessions");
    }
}
