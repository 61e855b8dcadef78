//! Content-addressed media storage.
//!
//! Uploaded files are stored under the media root by the SHA-256 of their
//! content:
//!
//! ```text
//! <root>/<aa>/<bb>/<sha256>.<ext>
//! ```
//!
//! where `aa` and `bb` are the first two byte pairs of the hex digest. The
//! path relative to the root is the file id that gets stored in the
//! database, and saving the same content twice yields the same id.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;

use crate::config::MediaConfig;

/// Errors from the media store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Refused to store an empty file.
    #[error("file is empty")]
    Empty,
}

/// Media files on the local filesystem.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    base_url: String,
}

impl MediaStorage {
    /// Create a store rooted at `root`, publicly reachable under `base_url`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Create a store from the media configuration.
    #[must_use]
    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.root.clone(), &config.url)
    }

    /// Store `bytes`, using the extension of `name`, and return the file id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Empty` for empty content and
    /// `StorageError::Io` if the file cannot be written.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::Empty);
        }

        let id = file_id(name, bytes);
        let path = self.root.join(&id);

        if tokio::fs::try_exists(&path).await? {
            tracing::debug!(%id, "Media file already stored");
            return Ok(id);
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write then rename so readers never see a partial file.
        let partial = path.with_extension("partial");
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &path).await?;

        tracing::info!(%id, "Media file stored");
        Ok(id)
    }

    /// Whether a file id is present in the store.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the filesystem cannot be queried.
    pub async fn exists(&self, id: &str) -> Result<bool, StorageError> {
        Ok(tokio::fs::try_exists(self.root.join(id)).await?)
    }

    /// Public URL of a stored file.
    #[must_use]
    pub fn url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id.trim_start_matches('/'))
    }
}

/// File id for `bytes` saved under `name`.
#[must_use]
pub fn file_id(name: &str, bytes: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    let (aa, rest) = digest.split_at(2);
    let bb = rest.get(..2).unwrap_or_default();

    match extension(name) {
        Some(ext) => format!("{aa}/{bb}/{digest}.{ext}"),
        None => format!("{aa}/{bb}/{digest}"),
    }
}

/// Lowercased extension of `name`, if it is a plain alphanumeric one.
fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_layout() {
        let id = file_id("Strawberry.JPG", b"berries");
        let digest = hex::encode(Sha256::digest(b"berries"));
        assert_eq!(
            id,
            format!("{}/{}/{digest}.jpg", &digest[..2], &digest[2..4])
        );
    }

    #[test]
    fn test_file_id_without_usable_extension() {
        let id = file_id("README", b"x");
        assert!(!id.contains('.'));
        let id = file_id("evil.j/pg", b"x");
        assert!(!id.ends_with("j/pg"));
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "/media/");

        let first = storage.save("a.png", b"png-bytes").await.unwrap();
        let second = storage.save("b.png", b"png-bytes").await.unwrap();
        assert_eq!(first, second);
        assert!(storage.exists(&first).await.unwrap());

        let stored = tokio::fs::read(dir.path().join(&first)).await.unwrap();
        assert_eq!(stored, b"png-bytes");
    }

    #[tokio::test]
    async fn test_save_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "/media");
        assert!(matches!(
            storage.save("a.png", b"").await,
            Err(StorageError::Empty)
        ));
    }

    #[test]
    fn test_url() {
        let storage = MediaStorage::new("media", "http://127.0.0.1:8888/");
        assert_eq!(
            storage.url("ab/cd/abcd.jpg"),
            "http://127.0.0.1:8888/ab/cd/abcd.jpg"
        );
    }
}
