//! Handoff registry between the two Telegram connections.
//!
//! The intake handler (Bot API side) publishes a [`DownloadContext`] keyed
//! by the attachment's `file_unique_id`; the large-file coordinator
//! (MTProto side) consumes it. The two sides observe the same physical
//! message independently and in no guaranteed order, so the consumer may
//! arrive before the producer has registered anything. [`take_or_wait`]
//! covers that race window with a bounded wait that wakes early when the
//! producer inserts.
//!
//! This is a pure key-value handoff, not a queue: `put` overwrites, `take`
//! removes, and a second `take` for the same id returns `None`.
//!
//! [`take_or_wait`]: ContextRegistry::take_or_wait

use crate::types::DownloadContext;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// Number of lookup attempts the coordinator makes before falling back to
/// default attribution.
pub const TAKE_ATTEMPTS: u32 = 5;

/// Pause between lookup attempts. Together with [`TAKE_ATTEMPTS`] this
/// bounds the race window at two seconds.
pub const TAKE_PAUSE: Duration = Duration::from_millis(500);

/// Short-lived mapping from `file_unique_id` to attribution metadata.
///
/// Shared between the intake handler and the coordinator via `Arc`;
/// injected by the composition root rather than living in a module
/// global.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: Mutex<HashMap<String, DownloadContext>>,
    inserted: Notify,
}

impl ContextRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the context for a unique id and wake any
    /// consumer currently waiting in [`take_or_wait`].
    ///
    /// [`take_or_wait`]: ContextRegistry::take_or_wait
    pub async fn put(&self, file_unique_id: impl Into<String>, context: DownloadContext) {
        let id = file_unique_id.into();
        self.contexts.lock().await.insert(id, context);
        self.inserted.notify_waiters();
    }

    /// Atomically remove and return the context for a unique id.
    ///
    /// Returns `None` when no context is registered; repeat calls after a
    /// successful take also return `None`.
    pub async fn take(&self, file_unique_id: &str) -> Option<DownloadContext> {
        self.contexts.lock().await.remove(file_unique_id)
    }

    /// [`take`] with a bounded wait for the producer to catch up.
    ///
    /// Re-checks after every insertion notification or after `pause`
    /// elapses, whichever comes first, for at most `attempts` checks.
    /// Returns `None` when the context never appears in time; the caller
    /// then falls back to default attribution and must not block the
    /// transfer.
    ///
    /// [`take`]: ContextRegistry::take
    pub async fn take_or_wait(
        &self,
        file_unique_id: &str,
        attempts: u32,
        pause: Duration,
    ) -> Option<DownloadContext> {
        for attempt in 0..attempts {
            // Register interest before checking so an insertion between
            // the check and the wait is not missed.
            let notified = self.inserted.notified();

            if let Some(context) = self.take(file_unique_id).await {
                if attempt > 0 {
                    tracing::debug!(
                        file_unique_id,
                        attempt,
                        "Context arrived after waiting for the intake handler"
                    );
                }
                return Some(context);
            }

            if attempt + 1 < attempts {
                let _ = tokio::time::timeout(pause, notified).await;
            }
        }
        None
    }

    /// Number of currently pending contexts (diagnostic)
    pub async fn len(&self) -> usize {
        self.contexts.lock().await.len()
    }

    /// Whether no contexts are pending
    pub async fn is_empty(&self) -> bool {
        self.contexts.lock().await.is_empty()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileKind;
    use std::sync::Arc;

    fn sample_context(name: &str) -> DownloadContext {
        DownloadContext {
            username: "alice".to_string(),
            file_kind: FileKind::Video,
            original_name: name.to_string(),
            status: None,
        }
    }

    #[tokio::test]
    async fn take_returns_registered_context() {
        let registry = ContextRegistry::new();
        registry.put("uid-1", sample_context("movie.mkv")).await;

        let ctx = registry.take("uid-1").await.unwrap();
        assert_eq!(ctx.original_name, "movie.mkv");
        assert_eq!(ctx.file_kind, FileKind::Video);
    }

    #[tokio::test]
    async fn take_then_take_returns_none() {
        let registry = ContextRegistry::new();
        registry.put("uid-1", sample_context("movie.mkv")).await;

        assert!(registry.take("uid-1").await.is_some());
        assert!(registry.take("uid-1").await.is_none());
    }

    #[tokio::test]
    async fn take_unknown_id_returns_none() {
        let registry = ContextRegistry::new();
        assert!(registry.take("never-registered").await.is_none());
    }

    #[tokio::test]
    async fn put_overwrites_previous_context() {
        let registry = ContextRegistry::new();
        registry.put("uid-1", sample_context("first.bin")).await;
        registry.put("uid-1", sample_context("second.bin")).await;

        let ctx = registry.take("uid-1").await.unwrap();
        assert_eq!(ctx.original_name, "second.bin");
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn take_or_wait_returns_immediately_when_present() {
        let registry = ContextRegistry::new();
        registry.put("uid-1", sample_context("a.bin")).await;

        let started = std::time::Instant::now();
        let ctx = registry
            .take_or_wait("uid-1", TAKE_ATTEMPTS, TAKE_PAUSE)
            .await;

        assert!(ctx.is_some());
        assert!(
            started.elapsed() < Duration::from_millis(100),
            "present context must resolve without waiting"
        );
    }

    #[tokio::test]
    async fn take_or_wait_wakes_on_late_insertion() {
        let registry = Arc::new(ContextRegistry::new());

        let producer = registry.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            producer.put("uid-race", sample_context("late.bin")).await;
        });

        let started = std::time::Instant::now();
        let ctx = registry
            .take_or_wait("uid-race", TAKE_ATTEMPTS, TAKE_PAUSE)
            .await;

        assert!(ctx.is_some(), "late-registered context must be found");
        assert!(
            started.elapsed() < Duration::from_millis(400),
            "notification should wake the waiter before the full pause elapses"
        );
    }

    #[tokio::test]
    async fn take_or_wait_gives_up_after_bounded_attempts() {
        let registry = ContextRegistry::new();

        let ctx = registry
            .take_or_wait("uid-missing", 2, Duration::from_millis(10))
            .await;

        assert!(ctx.is_none());
    }

    #[tokio::test]
    async fn notification_for_other_id_does_not_satisfy_waiter() {
        let registry = Arc::new(ContextRegistry::new());

        let producer = registry.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.put("uid-other", sample_context("other.bin")).await;
        });

        let ctx = registry
            .take_or_wait("uid-wanted", 3, Duration::from_millis(40))
            .await;

        assert!(ctx.is_none(), "unrelated insertions must not resolve the wait");
        assert_eq!(registry.len().await, 1, "the other context must remain");
    }
}
