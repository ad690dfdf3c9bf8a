//! Correlating media across the two Telegram connections.
//!
//! The Bot API identifies an attachment by its `file_unique_id`; the
//! MTProto connection only exposes the raw media id. Both connections see
//! the same physical file, and the Bot API id is a deterministic encoding
//! of the MTProto id: a little-endian type tag (photo = 1, document = 2)
//! followed by the little-endian 64-bit media id, base64-url encoded
//! without padding. Deriving that encoding here lets the coordinator look
//! up the context the intake handler registered under the Bot API id.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Type tag the Bot API uses for photos
const UNIQUE_TYPE_PHOTO: u32 = 1;

/// Type tag the Bot API uses for documents (also videos, audio, voice)
const UNIQUE_TYPE_DOCUMENT: u32 = 2;

fn encode(type_tag: u32, media_id: i64) -> String {
    let mut packed = [0u8; 12];
    packed[..4].copy_from_slice(&type_tag.to_le_bytes());
    packed[4..].copy_from_slice(&media_id.to_le_bytes());
    URL_SAFE_NO_PAD.encode(packed)
}

/// Bot-API-compatible `file_unique_id` for an MTProto document.
///
/// Covers every document-backed attachment (files, videos, audio, voice
/// notes) since those share the document id space.
pub fn document_unique_id(media_id: i64) -> String {
    encode(UNIQUE_TYPE_DOCUMENT, media_id)
}

/// Bot-API-compatible `file_unique_id` for an MTProto photo.
pub fn photo_unique_id(media_id: i64) -> String {
    encode(UNIQUE_TYPE_PHOTO, media_id)
}

/// Fallback correlation key when no media id is available.
///
/// Not shared with the Bot API side, so a context lookup under this key
/// always misses and the coordinator proceeds with default attribution.
pub fn message_fallback_id(message_id: i32) -> String {
    format!("msg_{message_id}")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_matches_known_encoding() {
        // 12 packed bytes: 02 00 00 00 | 01 00 00 00 00 00 00 00
        assert_eq!(document_unique_id(1), "AgAAAAEAAAAAAAAA");
    }

    #[test]
    fn photo_id_matches_known_encoding() {
        assert_eq!(photo_unique_id(1), "AQAAAAEAAAAAAAAA");
    }

    #[test]
    fn ids_are_always_sixteen_chars_without_padding() {
        for media_id in [0, 1, -1, i64::MAX, i64::MIN, 5_297_887_062_303_420_631] {
            let id = document_unique_id(media_id);
            assert_eq!(id.len(), 16, "12 bytes encode to 16 base64 chars");
            assert!(!id.contains('='), "no padding expected");
        }
    }

    #[test]
    fn photo_and_document_tags_never_collide() {
        assert_ne!(document_unique_id(42), photo_unique_id(42));
    }

    #[test]
    fn encoding_is_url_safe() {
        // Exhaust enough of the id space that '+' or '/' would appear if
        // the standard alphabet were used by mistake.
        for media_id in (0..4096).map(|n| n * 987_654_321) {
            let id = document_unique_id(media_id);
            assert!(
                id.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
                "unexpected character in {id}"
            );
        }
    }

    #[test]
    fn fallback_key_uses_message_id() {
        assert_eq!(message_fallback_id(7331), "msg_7331");
    }
}
