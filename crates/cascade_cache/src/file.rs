//! Filesystem cache store.

use crate::CacheStore;
use async_trait::async_trait;
use cascade_error::{CacheError, CacheErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument};

/// Extension of stored documents.
const DOCUMENT_EXTENSION: &str = "json";

/// Cache store keeping one JSON document per key under a directory.
///
/// # Features
///
/// - **Atomic writes**: temp file + rename, so readers never observe a
///   half-written document
/// - **Byte quota**: checked before every write
/// - **Lazy directory creation**: the directory is created on first write
#[derive(Debug)]
pub struct FileCacheStore {
    dir: PathBuf,
    max_bytes: Option<u64>,
    write_seq: AtomicU64,
}

impl FileCacheStore {
    /// Create a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>, max_bytes: Option<u64>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), ?max_bytes, "Creating file cache store");
        Self {
            dir,
            max_bytes,
            write_seq: AtomicU64::new(0),
        }
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CacheError::new(CacheErrorKind::Unavailable(format!(
                "invalid cache key '{}'",
                key
            ))));
        }
        Ok(self.dir.join(format!("{}.{}", key, DOCUMENT_EXTENSION)))
    }

    /// Total size of stored documents, excluding `skip` if given.
    async fn measure(&self, skip: Option<&Path>) -> Result<u64, CacheError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(CacheError::new(CacheErrorKind::Unavailable(format!(
                    "read {}: {}",
                    self.dir.display(),
                    e
                ))));
            }
        };

        let mut total = 0;
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            CacheError::new(CacheErrorKind::Unavailable(format!(
                "list {}: {}",
                self.dir.display(),
                e
            )))
        })? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            if skip == Some(path.as_path()) {
                continue;
            }
            if let Ok(metadata) = entry.metadata().await {
                total += metadata.len();
            }
        }
        Ok(total)
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.document_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(document) => Ok(Some(document)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => Err(CacheError::new(
                CacheErrorKind::Corrupt(format!("{}: {}", path.display(), e)),
            )),
            Err(e) => Err(CacheError::new(CacheErrorKind::Unavailable(format!(
                "read {}: {}",
                path.display(),
                e
            )))),
        }
    }

    #[instrument(skip(self, document), fields(bytes = document.len()))]
    async fn put_raw(&self, key: &str, document: String) -> Result<(), CacheError> {
        let path = self.document_path(key)?;

        if let Some(quota) = self.max_bytes {
            let used = self.measure(Some(&path)).await?;
            let requested = document.len() as u64;
            if used + requested > quota {
                return Err(CacheError::new(CacheErrorKind::QuotaExceeded {
                    used,
                    requested,
                    quota,
                }));
            }
        }

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            CacheError::new(CacheErrorKind::Unavailable(format!(
                "create {}: {}",
                self.dir.display(),
                e
            )))
        })?;

        // Write to temp file first, then rename for atomicity
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let temp_path = self
            .dir
            .join(format!("{}.{}.{}.tmp", key, std::process::id(), seq));
        tokio::fs::write(&temp_path, document.as_bytes())
            .await
            .map_err(|e| {
                CacheError::new(CacheErrorKind::Unavailable(format!(
                    "write {}: {}",
                    temp_path.display(),
                    e
                )))
            })?;

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(CacheError::new(CacheErrorKind::Unavailable(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))));
        }

        debug!(path = %path.display(), "Stored cache document");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let path = self.document_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::new(CacheErrorKind::Unavailable(format!(
                "remove {}: {}",
                path.display(),
                e
            )))),
        }
    }

    async fn used_bytes(&self) -> Result<u64, CacheError> {
        self.measure(None).await
    }
}
