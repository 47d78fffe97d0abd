//! Persistence port for the exhaustion registry.

use crate::RegistrySnapshot;
use async_trait::async_trait;
use cascade_error::{CascadeResult, StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, instrument, warn};

/// Where the exhaustion registry is kept between runs.
#[async_trait]
pub trait RegistryStore: Send + Sync + std::fmt::Debug {
    /// Load the last saved snapshot, or `None` if nothing was saved.
    async fn load(&self) -> CascadeResult<Option<RegistrySnapshot>>;

    /// Replace the saved snapshot.
    async fn save(&self, snapshot: &RegistrySnapshot) -> CascadeResult<()>;
}

/// Registry store backed by a single JSON file.
///
/// A missing file loads as "nothing saved". A file that does not decode is
/// logged and treated the same way. Writes go to a temp file that is then
/// renamed over the target.
#[derive(Debug, Clone)]
pub struct JsonFileRegistryStore {
    path: PathBuf,
}

impl JsonFileRegistryStore {
    /// Create a store for `path`. Parent directories are created on save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File the registry is kept in.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RegistryStore for JsonFileRegistryStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> CascadeResult<Option<RegistrySnapshot>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No persisted exhaustion state");
                return Ok(None);
            }
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
                .into());
            }
        };

        match serde_json::from_str(&contents) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(error = %e, "Ignoring corrupt exhaustion state file");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, snapshot), fields(path = %self.path.display(), exhausted = snapshot.exhausted_tier_ids.len()))]
    async fn save(&self, snapshot: &RegistrySnapshot) -> CascadeResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let json = serde_json::to_string_pretty(snapshot).map_err(|e| {
            StorageError::new(StorageErrorKind::InvalidRecord(e.to_string()))
        })?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;
        tokio::fs::rename(&temp_path, &self.path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            )))
        })?;

        debug!("Persisted exhaustion state");
        Ok(())
    }
}

/// In-memory registry store, for tests and ephemeral processes.
#[derive(Debug, Default)]
pub struct MemoryRegistryStore {
    snapshot: Mutex<Option<RegistrySnapshot>>,
    saves: AtomicUsize,
}

impl MemoryRegistryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `snapshot`.
    pub fn with_snapshot(snapshot: RegistrySnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            saves: AtomicUsize::new(0),
        }
    }

    /// The last saved snapshot.
    pub fn snapshot(&self) -> Option<RegistrySnapshot> {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `save` was called.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistryStore {
    async fn load(&self) -> CascadeResult<Option<RegistrySnapshot>> {
        Ok(self.snapshot())
    }

    async fn save(&self, snapshot: &RegistrySnapshot) -> CascadeResult<()> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
