//! Top-level error wrapper types.

use crate::{
    CacheError, ConfigError, FailureClass, JsonError, RouterError, RouterErrorKind,
    StorageError, UpstreamError,
};

/// Every error condition the Cascade crates can report.
///
/// # Examples
///
/// ```
/// use cascade_error::{CascadeError, ConfigError};
///
/// let err: CascadeError = ConfigError::new("missing tiers").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum CascadeErrorKind {
    /// Upstream call failure that was surfaced to the caller
    #[from(UpstreamError)]
    Upstream(UpstreamError),
    /// Routing failure (all backends exhausted, no tiers)
    #[from(RouterError)]
    Router(RouterError),
    /// Response cache failure
    #[from(CacheError)]
    Cache(CacheError),
    /// Persisted state failure
    #[from(StorageError)]
    Storage(StorageError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON decoding error
    #[from(JsonError)]
    Json(JsonError),
}

/// Cascade error with kind discrimination.
///
/// # Examples
///
/// ```
/// use cascade_error::{CascadeError, CascadeResult, RouterError, RouterErrorKind};
///
/// fn route() -> CascadeResult<String> {
///     Err(RouterError::new(RouterErrorKind::AllBackendsExhausted { attempts: 6 }))?
/// }
///
/// let err = route().unwrap_err();
/// assert!(err.is_backends_exhausted());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Cascade Error: {}", _0)]
pub struct CascadeError(Box<CascadeErrorKind>);

impl CascadeError {
    /// Create a new error from a kind.
    pub fn new(kind: CascadeErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CascadeErrorKind {
        &self.0
    }

    /// True when every backend tier was tried and none succeeded.
    ///
    /// Callers should present this as "temporarily saturated, retry later"
    /// rather than as a generic failure.
    pub fn is_backends_exhausted(&self) -> bool {
        matches!(
            self.kind(),
            CascadeErrorKind::Router(err)
                if matches!(err.kind(), RouterErrorKind::AllBackendsExhausted { .. })
        )
    }

    /// Failure class of the underlying upstream error, if this is one.
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self.kind() {
            CascadeErrorKind::Upstream(err) => Some(err.failure_class()),
            _ => None,
        }
    }
}

// Generic From implementation for any type that converts to CascadeErrorKind
impl<T> From<T> for CascadeError
where
    T: Into<CascadeErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Cascade operations.
pub type CascadeResult<T> = std::result::Result<T, CascadeError>;
