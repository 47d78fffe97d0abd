//! Cache storage port.

use async_trait::async_trait;
use cascade_error::CacheError;

/// Byte-oriented key/value storage for cache entries.
///
/// Stores hold serialized [`CacheEntry`](crate::CacheEntry) documents and
/// know nothing about TTLs; decoding and expiry belong to
/// [`ResponseCache`](crate::ResponseCache).
#[async_trait]
pub trait CacheStore: Send + Sync + std::fmt::Debug {
    /// Read the document stored under `key`.
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `document` under `key`, replacing any previous document.
    ///
    /// Fails with `QuotaExceeded` when the write would overflow the store's
    /// byte quota.
    async fn put_raw(&self, key: &str, document: String) -> Result<(), CacheError>;

    /// Remove the document stored under `key`, if any.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Bytes currently stored.
    async fn used_bytes(&self) -> Result<u64, CacheError>;
}
