//! Observability records for generation requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a request (or one attempt of it) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum UsageOutcome {
    /// The upstream returned text.
    #[display("success")]
    Success,
    /// The upstream call failed, or the request failed terminally.
    #[display("failure")]
    Failure,
    /// Served from the response cache without an upstream call.
    #[display("cache_hit")]
    CacheHit,
}

/// One record delivered to the usage sink.
///
/// A record is written per upstream attempt, per cache hit, and once more
/// when a request fails terminally.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct UsageRecord {
    /// Label of the calling feature
    feature: String,
    /// Tier that served (or failed) the attempt; `None` for cache hits and
    /// terminal failures
    tier_id: Option<String>,
    /// Outcome of the attempt
    outcome: UsageOutcome,
    /// Estimated prompt tokens
    input_tokens: u64,
    /// Estimated response tokens
    output_tokens: u64,
    /// Estimated cost in USD
    estimated_cost_usd: f64,
    /// Wall-clock latency of the upstream call
    latency_ms: u64,
    /// Error message, if the attempt failed
    error: Option<String>,
    /// When the record was produced
    timestamp: DateTime<Utc>,
}

impl UsageRecord {
    /// A record with zeroed measurements.
    pub fn new(feature: impl Into<String>, outcome: UsageOutcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            feature: feature.into(),
            tier_id: None,
            outcome,
            input_tokens: 0,
            output_tokens: 0,
            estimated_cost_usd: 0.0,
            latency_ms: 0,
            error: None,
            timestamp,
        }
    }

    /// A record for a response served from cache.
    pub fn cache_hit(feature: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(feature, UsageOutcome::CacheHit, timestamp)
    }

    /// True when the record describes a successful attempt or cache hit.
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, UsageOutcome::Failure)
    }
}
