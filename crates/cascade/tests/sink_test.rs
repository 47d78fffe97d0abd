//! Usage sink fanout and metrics wiring.

mod test_utils;

use cascade::{
    FanoutUsageSink, MetricsUsageSink, TracingUsageSink, UsageOutcome, UsageRecord, UsageSink,
};
use chrono::Utc;
use std::sync::Arc;
use test_utils::{FailingSink, RecordingSink};

fn record() -> UsageRecord {
    UsageRecord::new("digest", UsageOutcome::Success, Utc::now())
        .with_tier_id(Some("gemini-2.5-flash".to_string()))
        .with_input_tokens(120)
        .with_output_tokens(40)
        .with_latency_ms(850)
}

#[tokio::test]
async fn fanout_delivers_to_every_sink_even_after_a_failure() {
    let first = RecordingSink::default();
    let second = RecordingSink::default();
    let fanout = FanoutUsageSink::new(vec![
        Arc::new(first.clone()),
        Arc::new(FailingSink),
        Arc::new(second.clone()),
    ]);

    assert!(fanout.record(&record()).await.is_err());
    assert_eq!(first.records().len(), 1);
    assert_eq!(second.records().len(), 1);
}

#[tokio::test]
async fn builtin_sinks_accept_every_outcome() {
    let fanout = FanoutUsageSink::default()
        .with_sink(Arc::new(TracingUsageSink))
        .with_sink(Arc::new(MetricsUsageSink));
    assert_eq!(fanout.len(), 2);

    let failure = record()
        .with_outcome(UsageOutcome::Failure)
        .with_error(Some("HTTP 503".to_string()));
    let hit = UsageRecord::cache_hit("digest", Utc::now());

    for r in [record(), failure, hit] {
        fanout.record(&r).await.unwrap();
    }
}
