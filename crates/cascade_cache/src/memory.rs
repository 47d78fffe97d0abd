//! In-process cache store.

use crate::CacheStore;
use async_trait::async_trait;
use cascade_error::{CacheError, CacheErrorKind};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Cache store backed by a map, with an optional byte quota.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    documents: RwLock<HashMap<String, String>>,
    max_bytes: Option<u64>,
}

impl MemoryCacheStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that refuses writes beyond `max_bytes`.
    pub fn with_quota(max_bytes: u64) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            max_bytes: Some(max_bytes),
        }
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn put_raw(&self, key: &str, document: String) -> Result<(), CacheError> {
        let mut documents = self.documents.write().await;

        if let Some(quota) = self.max_bytes {
            let used: u64 = documents
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(_, doc)| doc.len() as u64)
                .sum();
            let requested = document.len() as u64;
            if used + requested > quota {
                return Err(CacheError::new(CacheErrorKind::QuotaExceeded {
                    used,
                    requested,
                    quota,
                }));
            }
        }

        documents.insert(key.to_string(), document);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.documents.write().await.remove(key);
        Ok(())
    }

    async fn used_bytes(&self) -> Result<u64, CacheError> {
        Ok(self
            .documents
            .read()
            .await
            .values()
            .map(|doc| doc.len() as u64)
            .sum())
    }
}
