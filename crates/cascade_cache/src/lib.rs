//! Response cache for generation requests.
//!
//! Responses are keyed by a SHA-256 hash of the preferred tier hint and the
//! exact request content, and expire after a configurable TTL. Entries are
//! never mutated and are evicted lazily when read after expiry.
//!
//! Storage is pluggable through [`CacheStore`]:
//!
//! - [`MemoryCacheStore`] - in-process map with an optional byte quota
//! - [`FileCacheStore`] - one JSON file per key under a directory

mod cache;
mod entry;
mod file;
mod key;
mod memory;
mod store;

pub use cache::ResponseCache;
pub use entry::CacheEntry;
pub use file::FileCacheStore;
pub use key::CacheKey;
pub use memory::MemoryCacheStore;
pub use store::CacheStore;
