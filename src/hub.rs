//! Fan-out hub for dashboard events.
//!
//! Each connected WebSocket session registers an unbounded channel with
//! the hub; [`broadcast`] attempts delivery to every session and removes
//! only the sessions whose channel is gone, so one dead consumer never
//! affects the rest. There is no history or replay: a session that
//! connects after an event was broadcast misses it permanently.
//!
//! [`broadcast`]: DashboardHub::broadcast

use crate::types::Event;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::sync::mpsc;

/// Identifier of a connected dashboard session
pub type SessionId = u64;

/// Pub/sub hub between the download paths and the dashboard sessions
#[derive(Debug, Default)]
pub struct DashboardHub {
    connections: Mutex<HashMap<SessionId, mpsc::UnboundedSender<Event>>>,
    next_id: AtomicU64,
}

impl DashboardHub {
    /// Create a hub with no connected sessions
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new dashboard session.
    ///
    /// The returned receiver yields every event broadcast while the
    /// session stays registered, starting with an immediate welcome
    /// event.
    pub async fn connect(&self) -> (SessionId, mpsc::UnboundedReceiver<Event>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        // Welcome the session before it becomes visible to broadcasts so
        // the greeting is always its first event.
        tx.send(Event::system("Connected to telegram-dl dashboard"))
            .ok();

        let mut connections = self.connections.lock().await;
        connections.insert(id, tx);
        tracing::info!(
            session_id = id,
            total_connections = connections.len(),
            "Dashboard session connected"
        );
        (id, rx)
    }

    /// Remove a session from the hub.
    pub async fn disconnect(&self, id: SessionId) {
        let mut connections = self.connections.lock().await;
        if connections.remove(&id).is_some() {
            tracing::info!(
                session_id = id,
                total_connections = connections.len(),
                "Dashboard session disconnected"
            );
        }
    }

    /// Deliver an event to every connected session.
    ///
    /// Delivery failure on one session removes only that session; the
    /// call itself never fails, so callers can fire-and-forget.
    pub async fn broadcast(&self, event: Event) {
        let mut connections = self.connections.lock().await;
        let mut dead = Vec::new();
        for (&id, tx) in connections.iter() {
            if tx.send(event.clone()).is_err() {
                dead.push(id);
            }
        }
        for id in dead {
            connections.remove(&id);
            tracing::warn!(session_id = id, "Dropping unreachable dashboard session");
        }
    }

    /// Number of currently connected sessions (for the health endpoint)
    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileKind;

    #[tokio::test]
    async fn new_session_receives_welcome_event() {
        let hub = DashboardHub::new();
        let (_id, mut rx) = hub.connect().await;

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, Event::System { .. }));
    }

    #[tokio::test]
    async fn broadcast_reaches_all_sessions() {
        let hub = DashboardHub::new();
        let (_a, mut rx_a) = hub.connect().await;
        let (_b, mut rx_b) = hub.connect().await;

        hub.broadcast(Event::status("bot_started", "polling")).await;

        // Skip the welcome events.
        rx_a.recv().await.unwrap();
        rx_b.recv().await.unwrap();

        assert!(matches!(rx_a.recv().await.unwrap(), Event::Status { .. }));
        assert!(matches!(rx_b.recv().await.unwrap(), Event::Status { .. }));
    }

    #[tokio::test]
    async fn failing_session_is_isolated_and_removed() {
        let hub = DashboardHub::new();
        let (_a, mut rx_a) = hub.connect().await;
        let (_b, rx_b) = hub.connect().await;
        let (_c, mut rx_c) = hub.connect().await;
        assert_eq!(hub.connection_count().await, 3);

        // Simulate a dead consumer.
        drop(rx_b);

        hub.broadcast(Event::file_received(
            "alice",
            "big.mkv",
            FileKind::Video,
            1 << 30,
        ))
        .await;

        // The two live sessions still get the event (after their welcome).
        rx_a.recv().await.unwrap();
        assert!(matches!(
            rx_a.recv().await.unwrap(),
            Event::FileReceived { .. }
        ));
        rx_c.recv().await.unwrap();
        assert!(matches!(
            rx_c.recv().await.unwrap(),
            Event::FileReceived { .. }
        ));

        assert_eq!(
            hub.connection_count().await,
            2,
            "the dead session must be removed from the active set"
        );
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let hub = DashboardHub::new();
        let (id, _rx) = hub.connect().await;

        hub.disconnect(id).await;
        hub.disconnect(id).await;

        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn late_session_misses_earlier_events() {
        let hub = DashboardHub::new();
        hub.broadcast(Event::error("transient")).await;

        let (_id, mut rx) = hub.connect().await;
        let first = rx.recv().await.unwrap();
        assert!(
            matches!(first, Event::System { .. }),
            "no replay: the only queued event is the welcome"
        );
    }
}
