//! File store handlers: listing, fetching, deletion, range streaming.

use crate::api::AppState;
use crate::error::Error;
use crate::storage;
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio_util::io::ReaderStream;

/// GET /downloads - List all downloaded files
#[utoipa::path(
    get,
    path = "/downloads",
    tag = "files",
    responses(
        (status = 200, description = "All stored files, sorted by name", body = Vec<crate::types::FileEntry>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_downloads(State(state): State<AppState>) -> Response {
    match storage::list_files(state.downloader.download_dir()).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list downloads");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal server error"})),
            )
                .into_response()
        }
    }
}

/// GET /downloads/:name - Fetch a stored file as an attachment
pub async fn fetch_download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    let path = match storage::resolve_existing(state.downloader.download_dir(), &name) {
        Ok(path) => path,
        Err(e) => return storage_error(e),
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::error!(file = %name, error = %e, "Failed to open file");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal server error"})),
            )
                .into_response();
        }
    };
    let size = file.metadata().await.map(|m| m.len()).unwrap_or(0);

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, guess_mime(&name)),
            (header::CONTENT_LENGTH, size.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}\""),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response()
}

/// DELETE /downloads/:name - Delete a stored file
#[utoipa::path(
    delete,
    path = "/downloads/{name}",
    tag = "files",
    params(
        ("name" = String, Path, description = "File name within the download directory")
    ),
    responses(
        (status = 200, description = "File deleted"),
        (status = 400, description = "Invalid file name"),
        (status = 404, description = "File not found")
    )
)]
pub async fn delete_download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match storage::delete_file(state.downloader.download_dir(), &name).await {
        Ok(()) => (StatusCode::OK, Json(json!({"deleted": name}))).into_response(),
        Err(e) => storage_error(e),
    }
}

/// GET /stream/:name - Stream a file inline with byte-range support
///
/// Honors standard `Range: bytes=start-end` semantics: 206 with the end
/// offset clamped to the file size, 416 when the start is out of bounds
/// or the header is malformed, and a full 200 body without a Range
/// header. Browsers probe with over-long ranges, hence the clamping.
pub async fn stream_download(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let path = match storage::resolve_existing(state.downloader.download_dir(), &name) {
        Ok(path) => path,
        Err(e) => return storage_error(e),
    };

    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::error!(file = %name, error = %e, "Failed to open file");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal server error"})),
            )
                .into_response();
        }
    };
    let size = file.metadata().await.map(|m| m.len()).unwrap_or(0);
    let mime = guess_mime(&name);

    let range_header = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    let Some(range_header) = range_header else {
        // Full-body response; advertise range support.
        return (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime),
                (header::ACCEPT_RANGES, "bytes".to_string()),
                (header::CONTENT_LENGTH, size.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("inline; filename=\"{name}\""),
                ),
            ],
            Body::from_stream(ReaderStream::new(file)),
        )
            .into_response();
    };

    let Some((start, end)) = parse_range(range_header, size) else {
        return (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{size}"))],
            Json(json!({"error": "range not satisfiable"})),
        )
            .into_response();
    };
    let len = end - start + 1;

    if let Err(e) = file.seek(SeekFrom::Start(start)).await {
        tracing::error!(file = %name, error = %e, "Failed to seek");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "internal server error"})),
        )
            .into_response();
    }

    (
        StatusCode::PARTIAL_CONTENT,
        [
            (header::CONTENT_TYPE, mime),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CONTENT_RANGE, format!("bytes {start}-{end}/{size}")),
            (header::CONTENT_LENGTH, len.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{name}\""),
            ),
        ],
        Body::from_stream(ReaderStream::new(file.take(len))),
    )
        .into_response()
}

/// Parse a `bytes=start-end` header against a known file size.
///
/// Returns the inclusive byte window, with the end clamped to `size - 1`.
/// `None` means the range is unsatisfiable: malformed syntax, a start at
/// or past the end of the file, or an inverted window.
fn parse_range(header: &str, size: u64) -> Option<(u64, u64)> {
    let spec = header.strip_prefix("bytes=")?;
    let (start_str, end_str) = spec.split_once('-')?;
    let start: u64 = start_str.trim().parse().ok()?;
    let end = if end_str.trim().is_empty() {
        size.checked_sub(1)?
    } else {
        end_str.trim().parse().ok()?
    };

    if start >= size {
        return None;
    }
    let end = end.min(size - 1);
    if end < start {
        return None;
    }
    Some((start, end))
}

fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .to_string()
}

fn storage_error(e: Error) -> Response {
    match e {
        Error::InvalidName(name) => {
            tracing::warn!(file = %name, "Rejected invalid filename");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "invalid filename"})),
            )
                .into_response()
        }
        Error::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "file not found"})),
        )
            .into_response(),
        other => {
            tracing::error!(error = %other, "File operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal server error"})),
            )
                .into_response()
        }
    }
}
