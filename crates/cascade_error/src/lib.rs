//! Error types for the Cascade router.
//!
//! This crate provides the foundation error types used throughout the Cascade workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Upstream failures additionally carry a [`FailureClass`], which is what the
//! router uses to decide between cascading, remembering exhaustion, and
//! surfacing the error to the caller.
//!
//! # Examples
//!
//! ```
//! use cascade_error::{CascadeResult, ConfigError};
//!
//! fn load() -> CascadeResult<String> {
//!     Err(ConfigError::new("no tiers configured"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod json;
mod router;
mod storage;
mod upstream;

pub use cache::{CacheError, CacheErrorKind};
pub use config::ConfigError;
pub use error::{CascadeError, CascadeErrorKind, CascadeResult};
pub use json::JsonError;
pub use router::{RouterError, RouterErrorKind};
pub use storage::{StorageError, StorageErrorKind};
pub use upstream::{FailureClass, UpstreamError, UpstreamErrorKind};
