//! OpenTelemetry metrics for generation requests.
//!
//! Instruments are registered on the global meter. Without an installed
//! meter provider they are no-ops.

use crate::UsageSink;
use async_trait::async_trait;
use cascade_core::{UsageOutcome, UsageRecord};
use cascade_error::CascadeResult;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::OnceLock;

static METRICS: OnceLock<CascadeMetrics> = OnceLock::new();

/// Instruments tracking requests, errors, cache hits, tokens and latency.
///
/// Labeled with the feature label, tier id and outcome.
#[derive(Clone)]
pub struct CascadeMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Upstream attempts and cache hits
    pub requests: Counter<u64>,
    /// Failed attempts and terminal failures
    pub errors: Counter<u64>,
    /// Responses served from cache
    pub cache_hits: Counter<u64>,
    /// Estimated tokens (input + output)
    pub tokens: Counter<u64>,
    /// Upstream call latency
    pub latency: Histogram<f64>,
}

impl CascadeMetrics {
    fn init() -> Self {
        let meter = global::meter("cascade");

        Self {
            _meter: meter.clone(),
            requests: meter
                .u64_counter("cascade.requests")
                .with_description("Upstream attempts and cache hits")
                .build(),
            errors: meter
                .u64_counter("cascade.errors")
                .with_description("Failed upstream attempts and terminal failures")
                .build(),
            cache_hits: meter
                .u64_counter("cascade.cache_hits")
                .with_description("Responses served from cache")
                .build(),
            tokens: meter
                .u64_counter("cascade.tokens")
                .with_description("Estimated tokens (input + output)")
                .build(),
            latency: meter
                .f64_histogram("cascade.latency")
                .with_unit("ms")
                .with_description("Upstream call latency")
                .build(),
        }
    }

    /// Get the global metrics instance.
    pub fn get() -> &'static Self {
        METRICS.get_or_init(Self::init)
    }

    /// Record one usage record.
    pub fn observe(&self, record: &UsageRecord) {
        let labels = [
            KeyValue::new("feature", record.feature().clone()),
            KeyValue::new(
                "tier",
                record.tier_id().clone().unwrap_or_else(|| "none".to_string()),
            ),
            KeyValue::new("outcome", record.outcome().to_string()),
        ];

        self.requests.add(1, &labels);
        match record.outcome() {
            UsageOutcome::CacheHit => self.cache_hits.add(1, &labels),
            UsageOutcome::Failure => self.errors.add(1, &labels),
            UsageOutcome::Success => {}
        }

        let tokens = record.input_tokens() + record.output_tokens();
        if tokens > 0 {
            self.tokens.add(tokens, &labels);
        }
        if record.tier_id().is_some() {
            self.latency.record(*record.latency_ms() as f64, &labels);
        }
    }
}

impl Default for CascadeMetrics {
    fn default() -> Self {
        Self::get().clone()
    }
}

/// Usage sink feeding [`CascadeMetrics`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsUsageSink;

#[async_trait]
impl UsageSink for MetricsUsageSink {
    async fn record(&self, record: &UsageRecord) -> CascadeResult<()> {
        CascadeMetrics::get().observe(record);
        Ok(())
    }
}
