//! Router error types.

/// Specific error conditions raised by the backend router.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum RouterErrorKind {
    /// Every tier failed within the attempt bound, even after a soft reset.
    #[display(
        "All backends exhausted after {} attempts; service temporarily saturated, retry later",
        attempts
    )]
    AllBackendsExhausted {
        /// Number of submissions made before giving up
        attempts: usize,
    },
    /// The router was built without any tiers.
    #[display("No backend tiers configured")]
    NoTiers,
}

/// Router error with location tracking.
///
/// # Examples
///
/// ```
/// use cascade_error::{RouterError, RouterErrorKind};
///
/// let err = RouterError::new(RouterErrorKind::AllBackendsExhausted { attempts: 4 });
/// assert!(format!("{}", err).contains("retry later"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Router Error: {} at line {} in {}", kind, line, file)]
pub struct RouterError {
    kind: RouterErrorKind,
    line: u32,
    file: &'static str,
}

impl RouterError {
    /// Create a new router error with caller location tracking.
    #[track_caller]
    pub fn new(kind: RouterErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RouterErrorKind {
        &self.kind
    }
}
