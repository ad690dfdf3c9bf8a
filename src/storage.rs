//! File store operations: save-path resolution, listing, deletion.
//!
//! All received files land in one flat download directory. The filename is
//! the only identity a stored file has; there is no index or metadata
//! sidecar, and sizes/timestamps are read from the filesystem at listing
//! time.

use crate::error::{Error, Result};
use crate::types::FileEntry;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Validate a client-supplied file name.
///
/// Stored files are addressed by bare name only; anything that could
/// escape the download directory (path separators, parent references,
/// empty names) is rejected.
pub fn sanitize_name(name: &str) -> Result<&str> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Compute a save path that will not overwrite an existing file.
///
/// When `<dir>/<name>` already exists the name is rewritten to
/// `<stem>_<disambiguator><suffix>`; the disambiguator is the attachment's
/// unique id on the Bot API path and the message id on the MTProto path.
/// Returns the path together with the final (possibly rewritten) name.
pub fn collision_free_path(dir: &Path, name: &str, disambiguator: &str) -> (PathBuf, String) {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return (candidate, name.to_string());
    }

    let original = Path::new(name);
    let stem = original
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let renamed = match original.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{disambiguator}.{ext}"),
        None => format!("{stem}_{disambiguator}"),
    };
    (dir.join(&renamed), renamed)
}

/// List all regular files in the download directory, sorted by name.
pub async fn list_files(dir: &Path) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    if !dir.exists() {
        return Ok(entries);
    }

    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            tracing::warn!(path = %entry.path().display(), "Skipping non-UTF-8 filename in listing");
            continue;
        };
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        entries.push(FileEntry {
            name,
            size: metadata.len(),
            modified,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Resolve a stored file by name, validating the name and existence.
pub fn resolve_existing(dir: &Path, name: &str) -> Result<PathBuf> {
    let name = sanitize_name(name)?;
    let path = dir.join(name);
    if !path.is_file() {
        return Err(Error::NotFound(name.to_string()));
    }
    Ok(path)
}

/// Delete a stored file by name.
pub async fn delete_file(dir: &Path, name: &str) -> Result<()> {
    let path = resolve_existing(dir, name)?;
    tokio::fs::remove_file(&path).await?;
    tracing::info!(file = name, "Deleted file");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn sanitize_accepts_plain_names() {
        assert_eq!(sanitize_name("report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_name("with spaces.txt").unwrap(), "with spaces.txt");
        assert_eq!(sanitize_name(".hidden").unwrap(), ".hidden");
    }

    #[test]
    fn sanitize_rejects_traversal_and_separators() {
        assert!(sanitize_name("").is_err());
        assert!(sanitize_name(".").is_err());
        assert!(sanitize_name("..").is_err());
        assert!(sanitize_name("../etc/passwd").is_err());
        assert!(sanitize_name("a/b.txt").is_err());
        assert!(sanitize_name("a\\b.txt").is_err());
        assert!(sanitize_name("nul\0byte").is_err());
    }

    #[test]
    fn collision_free_path_keeps_free_names() {
        let temp_dir = TempDir::new().unwrap();
        let (path, name) = collision_free_path(temp_dir.path(), "a.txt", "42");

        assert_eq!(path, temp_dir.path().join("a.txt"));
        assert_eq!(name, "a.txt");
    }

    #[test]
    fn collision_free_path_disambiguates_and_leaves_original_untouched() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "original").unwrap();

        let (path, name) = collision_free_path(temp_dir.path(), "a.txt", "9001");

        assert_eq!(path, temp_dir.path().join("a_9001.txt"));
        assert_eq!(name, "a_9001.txt");
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("a.txt")).unwrap(),
            "original",
            "existing file must not be touched"
        );
    }

    #[test]
    fn collision_free_path_without_extension() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("README"), "x").unwrap();

        let (_, name) = collision_free_path(temp_dir.path(), "README", "7");
        assert_eq!(name, "README_7");
    }

    #[test]
    fn collision_free_path_keeps_only_last_extension() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("backup.tar.gz"), "x").unwrap();

        let (_, name) = collision_free_path(temp_dir.path(), "backup.tar.gz", "55");
        assert_eq!(name, "backup.tar_55.gz");
    }

    #[tokio::test]
    async fn list_files_sorted_with_sizes() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("beta.bin"), [0u8; 10]).unwrap();
        fs::write(temp_dir.path().join("alpha.bin"), [0u8; 4]).unwrap();
        fs::create_dir(temp_dir.path().join("subdir")).unwrap();

        let entries = list_files(temp_dir.path()).await.unwrap();

        assert_eq!(entries.len(), 2, "directories are not listed");
        assert_eq!(entries[0].name, "alpha.bin");
        assert_eq!(entries[0].size, 4);
        assert_eq!(entries[1].name, "beta.bin");
        assert_eq!(entries[1].size, 10);
    }

    #[tokio::test]
    async fn list_files_on_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        let entries = list_files(&missing).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn delete_file_removes_only_the_target() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("keep.txt"), "k").unwrap();
        fs::write(temp_dir.path().join("drop.txt"), "d").unwrap();

        delete_file(temp_dir.path(), "drop.txt").await.unwrap();

        assert!(!temp_dir.path().join("drop.txt").exists());
        assert!(temp_dir.path().join("keep.txt").exists());
    }

    #[tokio::test]
    async fn delete_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let err = delete_file(temp_dir.path(), "ghost.txt").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn resolve_existing_rejects_traversal_before_touching_disk() {
        let temp_dir = TempDir::new().unwrap();
        let err = resolve_existing(temp_dir.path(), "../Cargo.toml").unwrap_err();
        assert!(matches!(err, Error::InvalidName(_)));
    }
}
