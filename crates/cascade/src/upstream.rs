//! Upstream generation service port.

use async_trait::async_trait;
use cascade_error::UpstreamError;
use cascade_rate_limit::BackendTier;
use serde::{Deserialize, Serialize};

/// Text returned by one successful upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamResponse {
    /// Generated text
    pub text: String,
}

impl UpstreamResponse {
    /// Wrap generated text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A generation service reachable through several interchangeable tiers.
///
/// Implementations classify failures through [`UpstreamError`]'s kind so the
/// router can tell rate limits and outages from everything else.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Generate a response for `content` on `tier`.
    async fn call(&self, tier: &BackendTier, content: &str)
    -> Result<UpstreamResponse, UpstreamError>;
}
