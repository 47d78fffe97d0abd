//! Deterministic cache keys.

use serde_json::Value;
use std::collections::BTreeMap;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a request's routing hint and content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a request.
    ///
    /// The pair is serialized as a JSON object with sorted keys before
    /// hashing, so the key only depends on the values.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascade_cache::CacheKey;
    ///
    /// let a = CacheKey::derive(Some("gemini-2.5-pro"), "Summarize this");
    /// let b = CacheKey::derive(Some("gemini-2.5-pro"), "Summarize this");
    /// let c = CacheKey::derive(None, "Summarize this");
    ///
    /// assert_eq!(a, b);
    /// assert_ne!(a, c);
    /// assert_eq!(a.as_str().len(), 64);
    /// ```
    pub fn derive(preferred_tier_id: Option<&str>, content: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("content", Value::from(content));
        fields.insert(
            "preferred_tier_id",
            preferred_tier_id.map_or(Value::Null, Value::from),
        );
        // Serializing a BTreeMap always emits keys in sorted order.
        let canonical = serde_json::to_string(&fields).unwrap_or_default();

        let digest = Sha256::digest(canonical.as_bytes());
        Self(format!("{:x}", digest))
    }

    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_changes_change_the_key() {
        assert_ne!(
            CacheKey::derive(None, "hello"),
            CacheKey::derive(None, "hello ")
        );
    }

    #[test]
    fn null_hint_differs_from_literal_string() {
        assert_ne!(
            CacheKey::derive(None, "x"),
            CacheKey::derive(Some("null"), "x")
        );
    }

    #[test]
    fn key_is_lowercase_hex() {
        let key = CacheKey::derive(Some("tier"), "content");
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
