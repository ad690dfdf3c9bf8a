//! Bot API intake: classify incoming media once and decide fast-path vs.
//! handoff.
//!
//! Files at or below the Bot API ceiling are downloaded directly on this
//! connection. Larger files cannot be fetched through the Bot API at all;
//! for those the handler registers a [`DownloadContext`] keyed by the
//! attachment's `file_unique_id` and defers to the MTProto coordinator,
//! which observes the mirrored copy of the same message on the user
//! account. The coordinator may observe its copy before this handler runs,
//! which is why the registry lookup on the other side waits out the race.

use crate::config::Config;
use crate::context::ContextRegistry;
use crate::coordinator::LargeFileCoordinator;
use crate::error::Result;
use crate::hub::DashboardHub;
use crate::storage;
use crate::types::{BOT_API_MAX_FILE_SIZE, DownloadContext, Event, StatusHandle};
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{Message, ParseMode};

mod media;

pub(crate) use media::{MediaMeta, classify};

/// The Bot API side of the dual-client setup.
///
/// Owns the teloxide bot and the per-message intake decision; shared state
/// (context registry, hub) is injected by the composition root.
pub struct IntakeBot {
    bot: Bot,
    config: Arc<Config>,
    contexts: Arc<ContextRegistry>,
    hub: Arc<DashboardHub>,
    coordinator: Option<Arc<LargeFileCoordinator>>,
    download_dir: PathBuf,
}

impl IntakeBot {
    /// Wire up an intake handler. `coordinator` is `None` in
    /// Bot-API-only mode, in which case oversized files are rejected with
    /// an explanation instead of being deferred.
    pub fn new(
        bot: Bot,
        config: Arc<Config>,
        contexts: Arc<ContextRegistry>,
        hub: Arc<DashboardHub>,
        coordinator: Option<Arc<LargeFileCoordinator>>,
    ) -> Self {
        let download_dir = config.download.download_dir.clone();
        Self {
            bot,
            config,
            contexts,
            hub,
            coordinator,
            download_dir,
        }
    }

    /// Whether a chat id may use the bot. An empty allow-list allows all.
    pub fn is_authorized(&self, chat_id: i64) -> bool {
        let allowed = &self.config.telegram.allowed_chat_ids;
        allowed.is_empty() || allowed.contains(&chat_id)
    }

    /// Run the long-polling dispatcher until shutdown.
    ///
    /// Every message is a failure-isolation boundary: handler errors are
    /// logged and surfaced to the dashboard, never propagated into the
    /// polling loop.
    pub async fn run(self: Arc<Self>) {
        tracing::info!("Starting Telegram bot polling");
        self.hub
            .broadcast(Event::status("bot_started", "Telegram bot is now polling"))
            .await;

        let handler = dptree::entry().branch(Update::filter_message().endpoint({
            let intake = Arc::clone(&self);
            move |msg: Message| {
                let intake = Arc::clone(&intake);
                async move {
                    if let Err(e) = intake.handle_message(&msg).await {
                        tracing::error!(chat_id = msg.chat.id.0, error = %e, "Message handling failed");
                        intake
                            .hub
                            .broadcast(Event::error(format!("Telegram bot error: {e}")))
                            .await;
                    }
                    respond(())
                }
            }
        }));

        Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|_| async {})
            .build()
            .dispatch()
            .await;

        self.hub
            .broadcast(Event::status("bot_stopped", "Telegram bot polling stopped"))
            .await;
    }

    /// Classify one incoming message and either download it here, hand it
    /// to the coordinator, or reply with a terminal per-message outcome.
    async fn handle_message(&self, msg: &Message) -> Result<()> {
        let chat_id = msg.chat.id;

        if !self.is_authorized(chat_id.0) {
            tracing::warn!(chat_id = chat_id.0, "Rejected unauthorized chat");
            self.bot
                .send_message(chat_id, "Sorry, you are not authorized to use this bot.")
                .await?;
            return Ok(());
        }

        let Some(meta) = classify(msg) else {
            // Media we do not handle gets a reply; plain text is ignored
            // (command handling is out of scope).
            if msg.sticker().is_some() || msg.animation().is_some() || msg.video_note().is_some() {
                self.bot
                    .send_message(chat_id, "Unsupported file type.")
                    .await?;
            }
            return Ok(());
        };

        let username = msg
            .from()
            .map(|user| {
                user.username
                    .clone()
                    .unwrap_or_else(|| user.first_name.clone())
            })
            .unwrap_or_else(|| "unknown".to_string());

        tracing::info!(
            chat_id = chat_id.0,
            file = %meta.original_name,
            kind = %meta.kind,
            size = meta.size,
            "Incoming file"
        );

        if meta.size > BOT_API_MAX_FILE_SIZE {
            return self.defer_large_file(msg, meta, username).await;
        }

        self.download_small_file(msg, meta, username).await
    }

    /// Hand an oversized file to the MTProto coordinator, or explain why
    /// that is not possible.
    async fn defer_large_file(&self, msg: &Message, meta: MediaMeta, username: String) -> Result<()> {
        let size_mb = meta.size as f64 / 1_048_576.0;

        let ready = self
            .coordinator
            .as_ref()
            .is_some_and(|coordinator| coordinator.is_ready());
        if !ready {
            self.bot
                .send_message(
                    msg.chat.id,
                    format!(
                        "⚠️ *File too large* ({size_mb:.1} MB)\n\n\
                         Telegram bots can only download files up to 20 MB.\n\
                         Configure TELEGRAM_API_ID / TELEGRAM_API_HASH to enable large files."
                    ),
                )
                .parse_mode(ParseMode::Markdown)
                .await?;
            return Ok(());
        }

        let notice = self
            .bot
            .send_message(
                msg.chat.id,
                format!(
                    "⏳ *Large file detected* ({size_mb:.1} MB)\n\
                     Downloading via the user client… this may take a while."
                ),
            )
            .parse_mode(ParseMode::Markdown)
            .await?;

        // Register attribution before returning; the coordinator side
        // waits out the window where this has not happened yet.
        self.contexts
            .put(
                meta.unique_id.clone(),
                DownloadContext {
                    username,
                    file_kind: meta.kind,
                    original_name: meta.original_name,
                    status: Some(StatusHandle {
                        chat: msg.chat.id,
                        message: notice.id,
                    }),
                },
            )
            .await;

        tracing::info!(
            file_unique_id = %meta.unique_id,
            "Deferred large file to the MTProto coordinator"
        );
        Ok(())
    }

    /// Fast path: fetch a within-limit file through the Bot API.
    async fn download_small_file(&self, msg: &Message, meta: MediaMeta, username: String) -> Result<()> {
        let tg_file = self.bot.get_file(meta.file_id.clone()).await?;

        let (save_path, final_name) =
            storage::collision_free_path(&self.download_dir, &meta.original_name, &meta.unique_id);

        let mut dst = tokio::fs::File::create(&save_path).await?;
        self.bot.download_file(&tg_file.path, &mut dst).await?;
        tracing::info!(path = %save_path.display(), "File saved");

        self.hub
            .broadcast(Event::file_received(
                username,
                final_name.clone(),
                meta.kind,
                meta.size,
            ))
            .await;

        self.bot
            .send_message(
                msg.chat.id,
                format!("✅ *File saved:* `{final_name}`\nYou can download it from the dashboard."),
            )
            .parse_mode(ParseMode::Markdown)
            .await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn test_intake(allowed: Vec<i64>) -> IntakeBot {
        let mut config = Config::default();
        config.telegram.bot_token = "123456:TEST".to_string();
        config.telegram.allowed_chat_ids = allowed;
        IntakeBot::new(
            Bot::new("123456:TEST"),
            Arc::new(config),
            Arc::new(ContextRegistry::new()),
            Arc::new(DashboardHub::new()),
            None,
        )
    }

    #[test]
    fn empty_allow_list_allows_everyone() {
        let intake = test_intake(vec![]);
        assert!(intake.is_authorized(1));
        assert!(intake.is_authorized(-100_200));
    }

    #[test]
    fn allow_list_restricts_to_listed_chats() {
        let intake = test_intake(vec![42, -1001]);
        assert!(intake.is_authorized(42));
        assert!(intake.is_authorized(-1001));
        assert!(!intake.is_authorized(7));
    }
}
