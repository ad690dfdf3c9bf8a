//! MTProto large-file coordinator.
//!
//! The bot account mirrors every message sent to it as an *outgoing*
//! message on the user account, so a user client watching its own outgoing
//! messages in the bot chat sees every file the bot receives, free of the
//! Bot API's 20 MiB download ceiling. This module owns that client:
//! it filters mirrored media, skips anything the intake handler already
//! owns, resolves attribution through the context registry (tolerating the
//! race where this side observes the message first), and executes the
//! transfer with progress reporting.
//!
//! The update loop never dies because of one bad transfer: every message
//! is handled behind a failure-isolation boundary that logs and reports
//! instead of propagating.

mod transfer;

use crate::config::Config;
use crate::context::{ContextRegistry, TAKE_ATTEMPTS, TAKE_PAUSE};
use crate::correlation;
use crate::error::{Error, Result};
use crate::hub::DashboardHub;
use crate::types::{DownloadContext, Event, FileKind, StatusHandle, within_bot_api_limit};
use grammers_client::session::Session;
use grammers_client::types::{Media, Message};
use grammers_client::{Client, Config as MtprotoConfig, InitParams, Update};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use teloxide::Bot;

/// What the coordinator learned about a mirrored attachment before
/// deciding whether to act on it.
#[derive(Clone, Debug)]
struct ObservedMedia {
    unique_id: String,
    size: u64,
    name: Option<String>,
}

/// The MTProto side of the dual-client setup.
pub struct LargeFileCoordinator {
    client: Client,
    bot: Bot,
    bot_chat_id: i64,
    me_name: String,
    contexts: Arc<ContextRegistry>,
    hub: Arc<DashboardHub>,
    download_dir: PathBuf,
    ready: AtomicBool,
}

impl LargeFileCoordinator {
    /// Connect the user client and verify the persisted session is signed
    /// in. Interactive login never happens here; see the session-login
    /// binary for the one-shot bootstrap.
    pub async fn connect(
        config: &Config,
        bot: Bot,
        bot_chat_id: i64,
        contexts: Arc<ContextRegistry>,
        hub: Arc<DashboardHub>,
    ) -> Result<Arc<Self>> {
        let user_client = &config.user_client;
        let (Some(api_id), Some(api_hash)) = (user_client.api_id, user_client.api_hash.clone())
        else {
            return Err(Error::Config {
                message: "MTProto credentials are not configured".to_string(),
                key: Some("user_client".to_string()),
            });
        };

        let session = Session::load_file_or_create(&user_client.session_file)?;
        let client = Client::connect(MtprotoConfig {
            session,
            api_id,
            api_hash,
            params: InitParams::default(),
        })
        .await
        .map_err(|e| Error::Mtproto(e.to_string()))?;

        if !client
            .is_authorized()
            .await
            .map_err(|e| Error::Mtproto(e.to_string()))?
        {
            return Err(Error::SessionNotAuthorized);
        }

        let me = client
            .get_me()
            .await
            .map_err(|e| Error::Mtproto(e.to_string()))?;
        let me_name = me.full_name();
        tracing::info!(
            user = %me_name,
            username = me.username().unwrap_or("-"),
            "MTProto client signed in"
        );

        client
            .session()
            .save_to_file(&user_client.session_file)?;

        Ok(Arc::new(Self {
            client,
            bot,
            bot_chat_id,
            me_name,
            contexts,
            hub,
            download_dir: config.download.download_dir.clone(),
            ready: AtomicBool::new(true),
        }))
    }

    /// Whether the client is connected and signed in.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    /// Spawn the update loop as a background task.
    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move { coordinator.run().await })
    }

    /// Consume updates until the task is aborted. Update-stream errors are
    /// logged and retried after a short pause; they do not stop the loop.
    async fn run(&self) {
        tracing::info!(bot_chat_id = self.bot_chat_id, "Watching for mirrored media");
        loop {
            match self.client.next_update().await {
                Ok(Update::NewMessage(message))
                    if message.outgoing() && message.chat().id() == self.bot_chat_id =>
                {
                    if let Err(e) = self.handle_outgoing_media(&message).await {
                        tracing::error!(message_id = message.id(), error = %e, "Large-file transfer failed");
                        self.hub
                            .broadcast(Event::error(format!("Large file download failed: {e}")))
                            .await;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "MTProto update stream error");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Decide whether a mirrored message is ours to download, and run the
    /// transfer when it is.
    async fn handle_outgoing_media(&self, message: &Message) -> Result<()> {
        let Some(media) = message.media() else {
            tracing::debug!(message_id = message.id(), "Outgoing non-media message, skipping");
            return Ok(());
        };

        let observed = match &media {
            Media::Document(doc) => ObservedMedia {
                unique_id: correlation::document_unique_id(doc.id()),
                size: doc.size().max(0) as u64,
                name: (!doc.name().is_empty()).then(|| doc.name().to_string()),
            },
            Media::Photo(_) => {
                // Photos are server-recompressed far below the Bot API
                // ceiling; the intake path always owns them.
                tracing::debug!(message_id = message.id(), "Outgoing photo, leaving to the Bot API");
                return Ok(());
            }
            _ => return Ok(()),
        };

        tracing::info!(
            message_id = message.id(),
            file_unique_id = %observed.unique_id,
            size = observed.size,
            "Observed mirrored media"
        );

        // Within-ceiling files are already being downloaded by the intake
        // handler; acting on them here would double-download. Size 0 means
        // the platform omitted the size, which is not proof of smallness.
        if within_bot_api_limit(observed.size) {
            tracing::info!(
                size = observed.size,
                "File fits the Bot API ceiling, leaving to the intake handler"
            );
            return Ok(());
        }

        // The intake handler may not have registered context yet; wait out
        // the race window before falling back to defaults.
        let context = self
            .contexts
            .take_or_wait(&observed.unique_id, TAKE_ATTEMPTS, TAKE_PAUSE)
            .await;
        tracing::info!(
            file_unique_id = %observed.unique_id,
            context_found = context.is_some(),
            "Resolved attribution"
        );

        let (username, file_kind, original_name, status) =
            resolve_attribution(context, observed.name, &self.me_name, message.id());

        let (save_path, final_name) = crate::storage::collision_free_path(
            &self.download_dir,
            &original_name,
            &message.id().to_string(),
        );
        tracing::info!(path = %save_path.display(), "Starting MTProto download");

        self.execute_transfer(transfer::TransferJob {
            message,
            media,
            save_path,
            final_name,
            declared_size: observed.size,
            username,
            file_kind,
            status,
        })
        .await;

        Ok(())
    }
}

/// Merge registered context with observed fallbacks: uploader defaults to
/// the client's own display name, kind to document, name to the
/// platform-supplied one or `file_<message_id>`.
fn resolve_attribution(
    context: Option<DownloadContext>,
    observed_name: Option<String>,
    me_name: &str,
    message_id: i32,
) -> (String, FileKind, String, Option<StatusHandle>) {
    match context {
        Some(context) => (
            context.username,
            context.file_kind,
            context.original_name,
            context.status,
        ),
        None => (
            me_name.to_string(),
            FileKind::Document,
            observed_name.unwrap_or_else(|| format!("file_{message_id}")),
            None,
        ),
    }
}

/// Await a side-channel notification and swallow its failure.
///
/// Status-message edits and similar notifications are deliberately
/// fire-and-forget: losing one must never abort a transfer. Keeping the
/// suppression in one named place distinguishes it from accidental error
/// swallowing.
pub(crate) async fn notify_best_effort<T, E>(
    what: &str,
    request: impl std::future::IntoFuture<Output = std::result::Result<T, E>>,
) where
    E: std::fmt::Display,
{
    if let Err(e) = request.await {
        tracing::debug!(notification = what, error = %e, "Non-critical notification failed");
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::{ChatId, MessageId};

    fn registered_context() -> DownloadContext {
        DownloadContext {
            username: "alice".to_string(),
            file_kind: FileKind::Video,
            original_name: "movie.mkv".to_string(),
            status: Some(StatusHandle {
                chat: ChatId(99),
                message: MessageId(7),
            }),
        }
    }

    #[test]
    fn attribution_prefers_registered_context() {
        let (username, kind, name, status) = resolve_attribution(
            Some(registered_context()),
            Some("mirrored-name.bin".to_string()),
            "Me",
            1234,
        );

        assert_eq!(username, "alice");
        assert_eq!(kind, FileKind::Video);
        assert_eq!(name, "movie.mkv");
        assert!(status.is_some());
    }

    #[test]
    fn attribution_falls_back_to_observed_name() {
        let (username, kind, name, status) =
            resolve_attribution(None, Some("archive.7z".to_string()), "Me", 1234);

        assert_eq!(username, "Me");
        assert_eq!(kind, FileKind::Document);
        assert_eq!(name, "archive.7z");
        assert!(status.is_none());
    }

    #[test]
    fn attribution_synthesizes_name_as_last_resort() {
        let (_, _, name, _) = resolve_attribution(None, None, "Me", 555);
        assert_eq!(name, "file_555");
    }

    #[tokio::test]
    async fn notify_best_effort_swallows_failures() {
        // Must not panic or propagate.
        notify_best_effort("test notification", async {
            Err::<(), _>(std::io::Error::other("edit failed"))
        })
        .await;
    }

    #[tokio::test]
    async fn race_lost_context_still_resolves_after_wait() {
        let contexts = Arc::new(ContextRegistry::new());

        // Producer registers 80ms after the consumer starts waiting.
        let producer = contexts.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(80)).await;
            producer.put("uid-late", registered_context()).await;
        });

        let context = contexts
            .take_or_wait("uid-late", TAKE_ATTEMPTS, TAKE_PAUSE)
            .await;
        let (username, ..) = resolve_attribution(context, None, "Me", 1);
        assert_eq!(username, "alice", "late context must win over defaults");
    }
}
