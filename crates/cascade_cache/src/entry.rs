//! Stored cache entries.

use chrono::{DateTime, Duration, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// One cached response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct CacheEntry {
    /// Hex key the entry is stored under
    key: String,
    /// Raw response text
    value: String,
    /// When the entry was written
    created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry.
    pub fn new(key: impl Into<String>, value: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            created_at,
        }
    }

    /// Whether the entry is older than `ttl` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }

    /// Consume the entry and return the cached text.
    pub fn into_value(self) -> String {
        self.value
    }
}
