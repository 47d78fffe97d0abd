//! Response cache error types.
//!
//! Cache errors never reach callers of the router; the cache logs and absorbs
//! them. They exist so cache stores can report what went wrong.

/// Kinds of cache failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CacheErrorKind {
    /// A stored entry could not be decoded
    #[display("Corrupt cache entry: {}", _0)]
    Corrupt(String),
    /// Writing would exceed the store's byte quota
    #[display("Cache quota exceeded: {} bytes used, {} requested, {} allowed", used, requested, quota)]
    QuotaExceeded {
        /// Bytes currently stored
        used: u64,
        /// Bytes the write needs
        requested: u64,
        /// Configured quota
        quota: u64,
    },
    /// Underlying storage failed
    #[display("Cache storage unavailable: {}", _0)]
    Unavailable(String),
}

/// Cache error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cache Error: {} at line {} in {}", kind, line, file)]
pub struct CacheError {
    /// The kind of error that occurred
    pub kind: CacheErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CacheError {
    /// Create a new cache error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CacheErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
