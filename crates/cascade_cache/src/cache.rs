//! TTL-aware response cache.

use crate::{CacheEntry, CacheKey, CacheStore};
use cascade_core::Clock;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Response cache over a pluggable [`CacheStore`].
///
/// Storage problems never surface to callers: a corrupt or unreadable entry
/// reads as absent, and a failed write (quota, I/O) is logged and dropped.
///
/// # Example
///
/// ```
/// use cascade_cache::{CacheKey, MemoryCacheStore, ResponseCache};
/// use cascade_core::SystemClock;
/// use chrono::Duration;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let cache = ResponseCache::new(
///     Arc::new(MemoryCacheStore::new()),
///     Arc::new(SystemClock),
///     Duration::hours(24),
/// );
/// let key = CacheKey::derive(None, "What is 2 + 2?");
/// cache.put(&key, "4").await;
/// assert_eq!(cache.get(&key).await.as_deref(), Some("4"));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    enabled: bool,
}

impl ResponseCache {
    /// Create an enabled cache.
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            enabled: true,
        }
    }

    /// Create a cache that never hits and never stores.
    pub fn disabled(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(crate::MemoryCacheStore::new()),
            clock,
            ttl: Duration::zero(),
            enabled: false,
        }
    }

    /// Whether lookups and writes are performed at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a fresh response.
    ///
    /// Expired entries are removed on the way out.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let document = match self.store.get_raw(key.as_str()).await {
            Ok(Some(document)) => document,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&document) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Corrupt cache entry, treating as miss");
                return None;
            }
        };

        if entry.is_expired(self.clock.now(), self.ttl) {
            debug!(created_at = %entry.created_at(), "Cache entry expired");
            if let Err(e) = self.store.remove(key.as_str()).await {
                warn!(error = %e, "Failed to evict expired cache entry");
            }
            return None;
        }

        debug!("Cache hit");
        Some(entry.into_value())
    }

    /// Store a response. Failures are logged and swallowed.
    #[instrument(skip(self, key, value), fields(key = %key, bytes = value.len()))]
    pub async fn put(&self, key: &CacheKey, value: &str) {
        if !self.enabled {
            return;
        }

        let entry = CacheEntry::new(key.as_str(), value, self.clock.now());
        let document = match serde_json::to_string(&entry) {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, "Failed to encode cache entry");
                return;
            }
        };

        match self.store.put_raw(key.as_str(), document).await {
            Ok(()) => debug!("Cached response"),
            Err(e) => warn!(error = %e, "Cache write failed, response not cached"),
        }
    }
}
