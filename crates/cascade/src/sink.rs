//! Usage record sinks.

use async_trait::async_trait;
use cascade_core::{UsageOutcome, UsageRecord};
use cascade_error::CascadeResult;
use std::sync::Arc;

/// Destination for per-attempt usage records.
///
/// Sink failures never fail a request; the facade logs and drops them.
#[async_trait]
pub trait UsageSink: Send + Sync {
    /// Deliver one record.
    async fn record(&self, record: &UsageRecord) -> CascadeResult<()>;
}

/// Emits each record as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUsageSink;

#[async_trait]
impl UsageSink for TracingUsageSink {
    async fn record(&self, record: &UsageRecord) -> CascadeResult<()> {
        let tier = record.tier_id().as_deref().unwrap_or("-");
        match record.outcome() {
            UsageOutcome::Failure => tracing::warn!(
                target: "cascade::usage",
                feature = %record.feature(),
                tier,
                outcome = %record.outcome(),
                input_tokens = record.input_tokens(),
                latency_ms = record.latency_ms(),
                error = record.error().as_deref().unwrap_or(""),
                "Generation attempt failed"
            ),
            _ => tracing::info!(
                target: "cascade::usage",
                feature = %record.feature(),
                tier,
                outcome = %record.outcome(),
                input_tokens = record.input_tokens(),
                output_tokens = record.output_tokens(),
                estimated_cost_usd = record.estimated_cost_usd(),
                latency_ms = record.latency_ms(),
                "Generation usage"
            ),
        }
        Ok(())
    }
}

/// Delivers every record to several sinks.
///
/// All sinks receive the record even when one fails; the first failure is
/// returned.
#[derive(Clone, Default)]
pub struct FanoutUsageSink {
    sinks: Vec<Arc<dyn UsageSink>>,
}

impl FanoutUsageSink {
    /// Create a fanout over `sinks`.
    pub fn new(sinks: Vec<Arc<dyn UsageSink>>) -> Self {
        Self { sinks }
    }

    /// Add another sink.
    pub fn with_sink(mut self, sink: Arc<dyn UsageSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no sinks.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for FanoutUsageSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutUsageSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[async_trait]
impl UsageSink for FanoutUsageSink {
    async fn record(&self, record: &UsageRecord) -> CascadeResult<()> {
        let results =
            futures::future::join_all(self.sinks.iter().map(|sink| sink.record(record))).await;
        results.into_iter().collect::<CascadeResult<Vec<()>>>()?;
        Ok(())
    }
}
