//! Core types and dashboard events for telegram-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teloxide::types::{ChatId, MessageId};
use utoipa::ToSchema;

/// Hard download ceiling of the Telegram Bot API. Files at or below this
/// size are handled entirely on the Bot API connection; anything larger is
/// deferred to the MTProto coordinator.
pub const BOT_API_MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

/// Whether a declared size proves the file is small enough for the Bot API.
///
/// A declared size of zero means the platform omitted the size, which is
/// treated as "not provably small": the coordinator must not skip such
/// media, otherwise files with absent size metadata would be dropped
/// silently.
pub fn within_bot_api_limit(size: u64) -> bool {
    size > 0 && size <= BOT_API_MAX_FILE_SIZE
}

/// Kind of media attachment, in classification precedence order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Generic document attachment
    Document,
    /// Photo (highest-resolution variant is used)
    Photo,
    /// Video attachment
    Video,
    /// Audio attachment
    Audio,
    /// Voice note
    Voice,
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FileKind::Document => "document",
            FileKind::Photo => "photo",
            FileKind::Video => "video",
            FileKind::Audio => "audio",
            FileKind::Voice => "voice",
        };
        write!(f, "{name}")
    }
}

/// Reference to an editable status message on the Bot API connection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusHandle {
    /// Chat the status message lives in
    pub chat: ChatId,
    /// The status message itself
    pub message: MessageId,
}

/// Attribution metadata handed from the intake handler to the large-file
/// coordinator for a single pending transfer.
///
/// Keyed by the attachment's `file_unique_id`, which is stable across both
/// connections for the same physical file. At most one live context exists
/// per id; it is consumed exactly once by whichever side resolves it.
#[derive(Clone, Debug)]
pub struct DownloadContext {
    /// Display name of the uploader
    pub username: String,
    /// Classified media kind
    pub file_kind: FileKind,
    /// Best-effort filename (platform-supplied or synthesized)
    pub original_name: String,
    /// Status message to edit with progress, if one was sent
    pub status: Option<StatusHandle>,
}

/// One row of the dashboard file listing, read from the filesystem at
/// listing time. The filename is the only identity a stored file has.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FileEntry {
    /// File name within the download directory
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: DateTime<Utc>,
}

/// Event pushed to connected dashboard sessions.
///
/// Events are transient and broadcast-only: a session that connects after
/// an event was sent misses it permanently. Every event carries the
/// timestamp of its construction.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Welcome message sent to each newly connected session
    System {
        /// Human-readable greeting
        message: String,
        /// Event creation time
        timestamp: DateTime<Utc>,
    },

    /// General status update (bot started, bot stopped, ...)
    Status {
        /// Short machine-friendly status tag
        status: String,
        /// Human-readable details
        details: String,
        /// Event creation time
        timestamp: DateTime<Utc>,
    },

    /// Something went wrong that the dashboard should surface
    Error {
        /// Error description
        error: String,
        /// Event creation time
        timestamp: DateTime<Utc>,
    },

    /// A file finished downloading and is available in the store
    FileReceived {
        /// Attributed uploader display name
        username: String,
        /// Final stored filename
        filename: String,
        /// Classified media kind
        file_type: FileKind,
        /// Size in bytes
        file_size: u64,
        /// Event creation time
        timestamp: DateTime<Utc>,
    },

    /// Live progress of an in-flight transfer
    DownloadProgress {
        /// Target filename
        filename: String,
        /// Bytes transferred so far
        current_bytes: u64,
        /// Total bytes expected (0 when unknown)
        total_bytes: u64,
        /// Percent complete, floor(current * 100 / total)
        pct: u32,
        /// Whether the transfer has finished (successfully or not)
        done: bool,
        /// Event creation time
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// Welcome event for a newly connected dashboard session
    pub fn system(message: impl Into<String>) -> Self {
        Event::System {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// General status update
    pub fn status(status: impl Into<String>, details: impl Into<String>) -> Self {
        Event::Status {
            status: status.into(),
            details: details.into(),
            timestamp: Utc::now(),
        }
    }

    /// Error notice
    pub fn error(error: impl Into<String>) -> Self {
        Event::Error {
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    /// Completed-file notice
    pub fn file_received(
        username: impl Into<String>,
        filename: impl Into<String>,
        file_type: FileKind,
        file_size: u64,
    ) -> Self {
        Event::FileReceived {
            username: username.into(),
            filename: filename.into(),
            file_type,
            file_size,
            timestamp: Utc::now(),
        }
    }

    /// Live progress update
    pub fn download_progress(
        filename: impl Into<String>,
        current_bytes: u64,
        total_bytes: u64,
        pct: u32,
        done: bool,
    ) -> Self {
        Event::DownloadProgress {
            filename: filename.into(),
            current_bytes,
            total_bytes,
            pct,
            done,
            timestamp: Utc::now(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_api_limit_boundaries() {
        assert!(within_bot_api_limit(1));
        assert!(within_bot_api_limit(BOT_API_MAX_FILE_SIZE));
        assert!(!within_bot_api_limit(BOT_API_MAX_FILE_SIZE + 1));
    }

    #[test]
    fn zero_size_is_not_provably_small() {
        // Media with absent size metadata must go through the coordinator
        // path instead of being skipped.
        assert!(!within_bot_api_limit(0));
    }

    #[test]
    fn events_serialize_with_snake_case_type_tag() {
        let event = Event::file_received("alice", "report.pdf", FileKind::Document, 42);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "file_received");
        assert_eq!(json["username"], "alice");
        assert_eq!(json["filename"], "report.pdf");
        assert_eq!(json["file_type"], "document");
        assert_eq!(json["file_size"], 42);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn progress_event_carries_done_flag() {
        let event = Event::download_progress("a.bin", 100, 100, 100, true);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "download_progress");
        assert_eq!(json["pct"], 100);
        assert_eq!(json["done"], true);
    }

    #[test]
    fn file_kind_display_matches_wire_format() {
        for (kind, expected) in [
            (FileKind::Document, "document"),
            (FileKind::Photo, "photo"),
            (FileKind::Video, "video"),
            (FileKind::Audio, "audio"),
            (FileKind::Voice, "voice"),
        ] {
            assert_eq!(kind.to_string(), expected);
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, expected);
        }
    }
}
