//! Upstream call errors and their failure classification.

/// How the router reacts to a failed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum FailureClass {
    /// The tier's budget is spent. Cascade and remember the tier as exhausted.
    #[display("rate_limited")]
    RateLimited,
    /// Transient upstream fault. Cascade for this call only.
    #[display("unavailable")]
    Unavailable,
    /// Anything else. Surface immediately without retrying another tier.
    #[display("other")]
    Other,
}

/// Specific upstream failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum UpstreamErrorKind {
    /// The tier rejected the call because its quota is spent (HTTP 429 or an
    /// explicit rate-limit signal in the response body).
    #[display("Rate limited: {}", _0)]
    RateLimited(String),
    /// The tier is temporarily unable to serve (HTTP 503, refused connection).
    #[display("Service unavailable: {}", _0)]
    Unavailable(String),
    /// The call did not complete within the configured timeout.
    #[display("Upstream call timed out after {} ms", _0)]
    Timeout(u64),
    /// The upstream answered with a non-retryable status.
    #[display("HTTP {} error: {}", status_code, message)]
    Rejected {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// The request could not be sent or the response could not be read.
    #[display("Transport error: {}", _0)]
    Transport(String),
    /// The response arrived but carried no usable text.
    #[display("Malformed response: {}", _0)]
    MalformedResponse(String),
    /// Credentials for the upstream are missing.
    #[display("Missing API key: {} environment variable not set", _0)]
    MissingApiKey(String),
}

impl UpstreamErrorKind {
    /// Classify an HTTP status plus response body.
    ///
    /// 429 and bodies carrying an explicit rate-limit signal map to
    /// `RateLimited`, 503 maps to `Unavailable`, everything else is
    /// `Rejected`.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status_code == 429 || signals_rate_limit(&message) {
            UpstreamErrorKind::RateLimited(message)
        } else if status_code == 503 {
            UpstreamErrorKind::Unavailable(message)
        } else {
            UpstreamErrorKind::Rejected {
                status_code,
                message,
            }
        }
    }

    /// The failure class the router acts on.
    pub fn failure_class(&self) -> FailureClass {
        match self {
            UpstreamErrorKind::RateLimited(_) => FailureClass::RateLimited,
            UpstreamErrorKind::Unavailable(_) | UpstreamErrorKind::Timeout(_) => {
                FailureClass::Unavailable
            }
            UpstreamErrorKind::Rejected { .. }
            | UpstreamErrorKind::Transport(_)
            | UpstreamErrorKind::MalformedResponse(_)
            | UpstreamErrorKind::MissingApiKey(_) => FailureClass::Other,
        }
    }
}

/// Whether a response body explicitly reports a spent quota.
fn signals_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("resource_exhausted")
        || lower.contains("rate limit")
        || lower.contains("rate-limit")
        || lower.contains("quota exceeded")
}

/// Upstream error with source location tracking.
///
/// # Examples
///
/// ```
/// use cascade_error::{FailureClass, UpstreamError, UpstreamErrorKind};
///
/// let err = UpstreamError::new(UpstreamErrorKind::from_status(429, "slow down"));
/// assert_eq!(err.failure_class(), FailureClass::RateLimited);
///
/// let err = UpstreamError::new(UpstreamErrorKind::from_status(400, "bad prompt"));
/// assert_eq!(err.failure_class(), FailureClass::Other);
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Upstream Error: {} at line {} in {}", kind, line, file)]
pub struct UpstreamError {
    /// The kind of error that occurred
    pub kind: UpstreamErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl UpstreamError {
    /// Create a new UpstreamError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: UpstreamErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// The failure class the router acts on.
    pub fn failure_class(&self) -> FailureClass {
        self.kind.failure_class()
    }
}
