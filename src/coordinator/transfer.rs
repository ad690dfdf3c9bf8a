//! Transfer execution for the large-file coordinator: chunked MTProto
//! download, coalesced progress reporting, and per-outcome notifications.

use super::{LargeFileCoordinator, notify_best_effort};
use crate::error::{Error, Result};
use crate::progress::{self, ProgressTracker};
use crate::types::{Event, FileKind, StatusHandle};
use grammers_client::types::{Downloadable, Media, Message};
use grammers_client::{InputMessage, InvocationError};
use std::path::{Path, PathBuf};
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::io::AsyncWriteExt;

/// Everything needed to run one transfer and report its outcome.
pub(super) struct TransferJob<'a> {
    pub message: &'a Message,
    pub media: Media,
    pub save_path: PathBuf,
    pub final_name: String,
    pub declared_size: u64,
    pub username: String,
    pub file_kind: FileKind,
    pub status: Option<StatusHandle>,
}

impl LargeFileCoordinator {
    /// Run a transfer end to end, including every outcome notification.
    /// Never returns an error: failures are reported to the chat and the
    /// dashboard and then dropped, keeping the update loop available for
    /// the next message.
    pub(super) async fn execute_transfer(&self, job: TransferJob<'_>) {
        match self
            .download_chunks(&job.media, &job.save_path, &job.final_name, job.declared_size, job.status.as_ref())
            .await
        {
            Ok(final_size) => self.report_success(&job, final_size).await,
            Err(Error::FloodWait { seconds }) => {
                tracing::warn!(seconds, "Telegram rate limit, sleeping");
                tokio::time::sleep(std::time::Duration::from_secs(u64::from(seconds))).await;
                if let Some(handle) = &job.status {
                    self.edit_status(handle, "⚠️ Rate limited — please retry.".to_string())
                        .await;
                }
            }
            Err(e) => {
                tracing::error!(file = %job.final_name, error = %e, "Download failed");
                // A zero/done progress event tells the dashboard to clear
                // any stalled indicator for this file.
                self.hub
                    .broadcast(Event::download_progress(
                        job.final_name.clone(),
                        0,
                        0,
                        0,
                        true,
                    ))
                    .await;
                if let Some(handle) = &job.status {
                    self.edit_status(handle, "❌ Download failed. Check server logs.".to_string())
                        .await;
                }
            }
        }
    }

    /// Chunked download with coalesced progress updates. Returns the final
    /// on-disk size after verifying the file exists.
    async fn download_chunks(
        &self,
        media: &Media,
        save_path: &Path,
        name: &str,
        total: u64,
        status: Option<&StatusHandle>,
    ) -> Result<u64> {
        let mut file = tokio::fs::File::create(save_path).await?;
        let mut tracker = ProgressTracker::new();
        let mut downloaded: u64 = 0;

        let mut download = self
            .client
            .iter_download(&Downloadable::Media(media.clone()));
        while let Some(chunk) = download.next().await.map_err(map_invocation_error)? {
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            if let Some(pct) = tracker.advance(downloaded, total) {
                self.report_progress(status, name, downloaded, total, pct)
                    .await;
            }
        }
        file.flush().await?;
        drop(file);

        // Transfer-success postcondition: the target must exist on disk.
        // Completeness is not checked; only existence.
        let metadata = tokio::fs::metadata(save_path)
            .await
            .map_err(|_| Error::TransferIncomplete(save_path.display().to_string()))?;
        Ok(metadata.len())
    }

    /// Push one coalesced progress step to the status message and the
    /// dashboard. Both deliveries are best-effort.
    async fn report_progress(
        &self,
        status: Option<&StatusHandle>,
        name: &str,
        current: u64,
        total: u64,
        pct: u32,
    ) {
        tracing::info!(
            file = name,
            pct,
            current_mib = current / 1_048_576,
            total_mib = total / 1_048_576,
            "Download progress"
        );

        if let Some(handle) = status {
            let bar = progress::render_bar(pct);
            self.edit_status(handle, format!("⏳ Downloading: [{bar}] {pct}%\n`{name}`"))
                .await;
        }

        self.hub
            .broadcast(Event::download_progress(name, current, total, pct, false))
            .await;
    }

    /// Completion notifications: forced 100% progress, the lifecycle
    /// event, and the chat-side confirmation.
    async fn report_success(&self, job: &TransferJob<'_>, final_size: u64) {
        let size_mb = final_size as f64 / 1_048_576.0;
        tracing::info!(
            path = %job.save_path.display(),
            size_mb,
            "Download complete"
        );

        self.hub
            .broadcast(Event::download_progress(
                job.final_name.clone(),
                final_size,
                final_size,
                100,
                true,
            ))
            .await;
        self.hub
            .broadcast(Event::file_received(
                job.username.clone(),
                job.final_name.clone(),
                job.file_kind,
                final_size,
            ))
            .await;

        match &job.status {
            Some(handle) => {
                self.edit_status(
                    handle,
                    format!(
                        "✅ *Downloaded:* `{}`\nSize: {size_mb:.1} MB",
                        job.final_name
                    ),
                )
                .await;
            }
            None => {
                // No status message to edit (the context was never
                // claimed); announce completion in the bot chat instead.
                notify_best_effort(
                    "completion message",
                    self.client.send_message(
                        &job.message.chat(),
                        InputMessage::text(format!(
                            "✅ Downloaded: {} ({size_mb:.1} MB)",
                            job.final_name
                        )),
                    ),
                )
                .await;
            }
        }
    }

    /// Best-effort edit of the Bot API status message.
    async fn edit_status(&self, handle: &StatusHandle, text: String) {
        notify_best_effort(
            "status message edit",
            self.bot
                .edit_message_text(handle.chat, handle.message, text)
                .parse_mode(ParseMode::Markdown),
        )
        .await;
    }
}

/// Map a grammers invocation error onto the crate error type, pulling the
/// mandated wait out of FLOOD_WAIT responses.
fn map_invocation_error(e: InvocationError) -> Error {
    match e {
        InvocationError::Rpc(rpc) if rpc.name.starts_with("FLOOD_WAIT") => Error::FloodWait {
            seconds: rpc.value.unwrap_or(30),
        },
        other => Error::Mtproto(other.to_string()),
    }
}
