//! Media classification for incoming Bot API messages.

use crate::types::FileKind;
use teloxide::types::Message;

/// Everything the intake decision needs about an attachment, extracted
/// before any download happens.
#[derive(Clone, Debug)]
pub(crate) struct MediaMeta {
    /// Classified media kind
    pub kind: FileKind,
    /// Bot API file id used to fetch the content
    pub file_id: String,
    /// Stable id shared with the MTProto connection
    pub unique_id: String,
    /// Declared size in bytes (0 when the platform omitted it)
    pub size: u64,
    /// Platform-supplied filename or a synthesized one
    pub original_name: String,
}

/// Classify a message's attachment, in precedence order document, photo,
/// video, audio, voice. Photos use the highest-resolution variant.
/// Returns `None` for messages without a supported attachment.
pub(crate) fn classify(msg: &Message) -> Option<MediaMeta> {
    if let Some(doc) = msg.document() {
        return Some(MediaMeta {
            kind: FileKind::Document,
            file_id: doc.file.id.clone(),
            unique_id: doc.file.unique_id.clone(),
            size: u64::from(doc.file.size),
            original_name: doc
                .file_name
                .clone()
                .unwrap_or_else(|| format!("document_{}", doc.file.unique_id)),
        });
    }

    if let Some(sizes) = msg.photo() {
        // Variants are ordered smallest to largest.
        let best = sizes.last()?;
        return Some(MediaMeta {
            kind: FileKind::Photo,
            file_id: best.file.id.clone(),
            unique_id: best.file.unique_id.clone(),
            size: u64::from(best.file.size),
            original_name: format!("photo_{}.jpg", best.file.unique_id),
        });
    }

    if let Some(video) = msg.video() {
        return Some(MediaMeta {
            kind: FileKind::Video,
            file_id: video.file.id.clone(),
            unique_id: video.file.unique_id.clone(),
            size: u64::from(video.file.size),
            original_name: video
                .file_name
                .clone()
                .unwrap_or_else(|| format!("video_{}.mp4", video.file.unique_id)),
        });
    }

    if let Some(audio) = msg.audio() {
        return Some(MediaMeta {
            kind: FileKind::Audio,
            file_id: audio.file.id.clone(),
            unique_id: audio.file.unique_id.clone(),
            size: u64::from(audio.file.size),
            original_name: audio
                .file_name
                .clone()
                .unwrap_or_else(|| format!("audio_{}.mp3", audio.file.unique_id)),
        });
    }

    if let Some(voice) = msg.voice() {
        return Some(MediaMeta {
            kind: FileKind::Voice,
            file_id: voice.file.id.clone(),
            unique_id: voice.file.unique_id.clone(),
            size: u64::from(voice.file.size),
            original_name: format!("voice_{}.ogg", voice.file.unique_id),
        });
    }

    None
}
