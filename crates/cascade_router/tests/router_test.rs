//! Routing behaviour of BackendRouter against scripted tiers.

use cascade_core::ManualClock;
use cascade_error::{FailureClass, UpstreamError, UpstreamErrorKind};
use cascade_rate_limit::{BackendTier, RouterConfig};
use cascade_router::{
    BackendRouter, JsonFileRegistryStore, MemoryRegistryStore, RegistrySnapshot, RegistryStore,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Status(u16),
    Hang(Duration),
}

/// Scripted upstream: each tier answers from its queue of replies, then succeeds.
#[derive(Debug, Clone, Default)]
struct Script {
    replies: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Script {
    fn push(&self, tier: &str, reply: Reply, times: usize) {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.entry(tier.to_string()).or_default();
        for _ in 0..times {
            queue.push_back(reply.clone());
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn call(&self, tier: &str) -> Result<String, UpstreamError> {
        self.calls.lock().unwrap().push(tier.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(tier)
            .and_then(VecDeque::pop_front);

        match reply {
            None => Ok(format!("from {}", tier)),
            Some(Reply::Status(code)) => Err(UpstreamError::new(UpstreamErrorKind::from_status(
                code, "scripted",
            ))),
            Some(Reply::Hang(duration)) => {
                tokio::time::sleep(duration).await;
                Ok(format!("late from {}", tier))
            }
        }
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 10, 12, 0, 0).unwrap()
}

fn two_tiers() -> Vec<BackendTier> {
    vec![BackendTier::new("a", 60, 0), BackendTier::new("b", 60, 1)]
}

fn exhausted(ids: &[&str], saved_at: DateTime<Utc>) -> RegistrySnapshot {
    RegistrySnapshot {
        exhausted_tier_ids: ids.iter().map(|id| id.to_string()).collect(),
        saved_at,
    }
}

async fn router_with(
    tiers: Vec<BackendTier>,
    store: Arc<MemoryRegistryStore>,
    config: RouterConfig,
) -> BackendRouter {
    BackendRouter::load(tiers, store, Arc::new(ManualClock::new(now())), config)
        .await
        .unwrap()
}

async fn run(
    router: &BackendRouter,
    script: &Script,
    preferred: Option<&str>,
) -> cascade_error::CascadeResult<String> {
    router
        .execute(
            |tier: BackendTier| {
                let script = script.clone();
                async move { script.call(&tier.id).await }
            },
            preferred,
        )
        .await
}

#[tokio::test(start_paused = true)]
async fn highest_priority_tier_is_tried_first() {
    let tiers = vec![BackendTier::new("low", 60, 5), BackendTier::new("high", 60, 1)];
    let router = router_with(tiers, Arc::new(MemoryRegistryStore::new()), RouterConfig::default()).await;
    let script = Script::default();

    assert_eq!(run(&router, &script, None).await.unwrap(), "from high");
    assert_eq!(script.calls(), ["high"]);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_preferred_tier_is_skipped_by_later_rotation() {
    let store = Arc::new(MemoryRegistryStore::new());
    let router = router_with(two_tiers(), store.clone(), RouterConfig::default()).await;
    let script = Script::default();
    script.push("a", Reply::Status(429), 1);

    assert_eq!(run(&router, &script, Some("a")).await.unwrap(), "from b");
    assert_eq!(run(&router, &script, None).await.unwrap(), "from b");

    assert_eq!(script.calls(), ["a", "b", "b"]);
    assert_eq!(router.exhausted_tiers().await, ["a"]);
    assert_eq!(router.cursor_position(), 1);
    assert_eq!(store.snapshot().unwrap().exhausted_tier_ids, ["a"]);
}

#[tokio::test(start_paused = true)]
async fn unavailable_tier_cascades_without_being_marked() {
    let router = router_with(two_tiers(), Arc::new(MemoryRegistryStore::new()), RouterConfig::default()).await;
    let script = Script::default();
    script.push("a", Reply::Status(503), 1);

    assert_eq!(run(&router, &script, None).await.unwrap(), "from b");
    assert!(router.exhausted_tiers().await.is_empty());

    assert_eq!(run(&router, &script, None).await.unwrap(), "from a");
    assert_eq!(script.calls(), ["a", "b", "a"]);
}

#[tokio::test(start_paused = true)]
async fn other_failures_propagate_without_cascading() {
    let router = router_with(two_tiers(), Arc::new(MemoryRegistryStore::new()), RouterConfig::default()).await;
    let script = Script::default();
    script.push("a", Reply::Status(400), 1);

    let err = run(&router, &script, None).await.unwrap_err();
    assert_eq!(err.failure_class(), Some(FailureClass::Other));
    assert!(!err.is_backends_exhausted());
    assert_eq!(script.calls(), ["a"]);
}

#[tokio::test(start_paused = true)]
async fn soft_reset_when_every_tier_is_exhausted() {
    let store = Arc::new(MemoryRegistryStore::with_snapshot(exhausted(
        &["a", "b"],
        now() - ChronoDuration::hours(1),
    )));
    let router = router_with(two_tiers(), store.clone(), RouterConfig::default()).await;
    assert_eq!(router.exhausted_tiers().await.len(), 2);
    assert_eq!(router.cursor_position(), 2);

    let script = Script::default();
    assert_eq!(run(&router, &script, None).await.unwrap(), "from a");

    assert!(router.exhausted_tiers().await.is_empty());
    assert_eq!(router.cursor_position(), 0);
    assert!(store.snapshot().unwrap().exhausted_tier_ids.is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_soft_resets_clear_once() {
    let store = Arc::new(MemoryRegistryStore::with_snapshot(exhausted(&["a", "b"], now())));
    let router = Arc::new(router_with(two_tiers(), store.clone(), RouterConfig::default()).await);
    let script = Script::default();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let router = Arc::clone(&router);
            let script = script.clone();
            tokio::spawn(async move { run(&router, &script, None).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(store.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn prior_day_registry_is_discarded_on_load() {
    let store = Arc::new(MemoryRegistryStore::with_snapshot(exhausted(
        &["a"],
        now() - ChronoDuration::days(1),
    )));
    let router = router_with(two_tiers(), store, RouterConfig::default()).await;
    assert!(router.exhausted_tiers().await.is_empty());
    assert_eq!(router.cursor_position(), 0);
}

#[tokio::test(start_paused = true)]
async fn busy_tier_overflows_to_idle_lower_tier() {
    let tiers = vec![BackendTier::new("a", 1, 0), BackendTier::new("b", 60, 1)];
    let router = router_with(tiers, Arc::new(MemoryRegistryStore::new()), RouterConfig::default()).await;
    let script = Script::default();

    let started = tokio::time::Instant::now();
    assert_eq!(run(&router, &script, None).await.unwrap(), "from a");
    assert_eq!(run(&router, &script, None).await.unwrap(), "from b");
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(script.calls(), ["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn concurrent_calls_spread_across_tiers() {
    let tiers = vec![BackendTier::new("a", 1, 0), BackendTier::new("b", 60, 1)];
    let router = router_with(tiers, Arc::new(MemoryRegistryStore::new()), RouterConfig::default()).await;
    let script = Script::default();
    script.push("a", Reply::Hang(Duration::from_millis(500)), 1);
    script.push("b", Reply::Hang(Duration::from_millis(500)), 1);

    let started = tokio::time::Instant::now();
    let (first, second) = tokio::join!(run(&router, &script, None), run(&router, &script, None));

    assert_eq!(first.unwrap(), "late from a");
    assert_eq!(second.unwrap(), "late from b");
    // Both tiers ran at once: one hang's worth of time, far below a's interval.
    assert!(started.elapsed() < Duration::from_millis(1_000));
    assert_eq!(router.queue("a").unwrap().dispatched(), 1);
    assert_eq!(router.queue("b").unwrap().dispatched(), 1);
}

#[tokio::test(start_paused = true)]
async fn saturated_tiers_yield_to_the_soonest_start() {
    let tiers = vec![BackendTier::new("a", 1, 0), BackendTier::new("b", 60, 1)];
    let router = router_with(tiers, Arc::new(MemoryRegistryStore::new()), RouterConfig::default()).await;
    let script = Script::default();

    let started = tokio::time::Instant::now();
    let (first, second, third) = tokio::join!(
        run(&router, &script, None),
        run(&router, &script, None),
        run(&router, &script, None)
    );

    assert_eq!(first.unwrap(), "from a");
    assert_eq!(second.unwrap(), "from b");
    assert_eq!(third.unwrap(), "from b");
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1_100));
    assert!(elapsed < Duration::from_secs(2));
    assert_eq!(script.calls(), ["a", "b", "b"]);
}

#[tokio::test(start_paused = true)]
async fn busy_tier_is_awaited_when_lower_tiers_are_exhausted() {
    let tiers = vec![BackendTier::new("a", 1, 0), BackendTier::new("b", 60, 1)];
    let store = Arc::new(MemoryRegistryStore::with_snapshot(exhausted(&["b"], now())));
    let router = router_with(tiers, store, RouterConfig::default()).await;
    let script = Script::default();

    let started = tokio::time::Instant::now();
    assert_eq!(run(&router, &script, None).await.unwrap(), "from a");
    assert_eq!(run(&router, &script, None).await.unwrap(), "from a");
    assert!(started.elapsed() >= Duration::from_millis(66_000));
    assert_eq!(script.calls(), ["a", "a"]);
}

#[tokio::test(start_paused = true)]
async fn overflow_can_be_disabled() {
    let tiers = vec![BackendTier::new("a", 1, 0), BackendTier::new("b", 60, 1)];
    let config = RouterConfig {
        overflow_to_idle_tiers: false,
        ..RouterConfig::default()
    };
    let router = router_with(tiers, Arc::new(MemoryRegistryStore::new()), config).await;
    let script = Script::default();

    run(&router, &script, None).await.unwrap();
    run(&router, &script, None).await.unwrap();
    assert_eq!(script.calls(), ["a", "a"]);
}

#[tokio::test(start_paused = true)]
async fn timeouts_count_as_unavailable() {
    let config = RouterConfig {
        call_timeout_secs: 1,
        ..RouterConfig::default()
    };
    let router = router_with(two_tiers(), Arc::new(MemoryRegistryStore::new()), config).await;
    let script = Script::default();
    script.push("a", Reply::Hang(Duration::from_secs(5)), 1);

    assert_eq!(run(&router, &script, None).await.unwrap(), "from b");
    assert!(router.exhausted_tiers().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn persistent_outage_ends_in_backends_exhausted() {
    let router = router_with(two_tiers(), Arc::new(MemoryRegistryStore::new()), RouterConfig::default()).await;
    let script = Script::default();
    script.push("a", Reply::Status(503), 10);
    script.push("b", Reply::Status(503), 10);

    let err = run(&router, &script, None).await.unwrap_err();
    assert!(err.is_backends_exhausted());
    assert_eq!(script.calls(), ["a", "b", "a"]);
}

#[tokio::test(start_paused = true)]
async fn unknown_preferred_tier_is_ignored() {
    let router = router_with(two_tiers(), Arc::new(MemoryRegistryStore::new()), RouterConfig::default()).await;
    let script = Script::default();

    assert_eq!(run(&router, &script, Some("nope")).await.unwrap(), "from a");
    assert_eq!(script.calls(), ["a"]);
}

#[tokio::test(start_paused = true)]
async fn manual_reset_clears_and_persists() {
    let store = Arc::new(MemoryRegistryStore::with_snapshot(exhausted(&["a"], now())));
    let router = router_with(two_tiers(), store.clone(), RouterConfig::default()).await;

    let status = router.tier_status().await;
    assert!(status[0].exhausted);
    assert!(!status[1].exhausted);
    assert_eq!(status[1].min_interval, Duration::from_millis(1_100));

    assert_eq!(router.reset_exhaustion().await.unwrap(), 1);
    assert!(router.exhausted_tiers().await.is_empty());
    assert!(store.snapshot().unwrap().exhausted_tier_ids.is_empty());
}

#[tokio::test]
async fn file_store_carries_exhaustion_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("exhaustion.json");
    let clock = Arc::new(ManualClock::new(now()));
    let script = Script::default();
    script.push("a", Reply::Status(429), 1);

    {
        let store = Arc::new(JsonFileRegistryStore::new(&path));
        let router = BackendRouter::load(two_tiers(), store, clock.clone(), RouterConfig::default())
            .await
            .unwrap();
        assert_eq!(run(&router, &script, None).await.unwrap(), "from b");
    }

    let store = Arc::new(JsonFileRegistryStore::new(&path));
    let persisted = store.load().await.unwrap().unwrap();
    assert_eq!(persisted.exhausted_tier_ids, ["a"]);

    let router = BackendRouter::load(two_tiers(), store, clock.clone(), RouterConfig::default())
        .await
        .unwrap();
    assert_eq!(router.exhausted_tiers().await, ["a"]);

    clock.advance(ChronoDuration::days(1));
    let store = Arc::new(JsonFileRegistryStore::new(&path));
    let router = BackendRouter::load(two_tiers(), store, clock, RouterConfig::default())
        .await
        .unwrap();
    assert!(router.exhausted_tiers().await.is_empty());
}

#[tokio::test]
async fn corrupt_state_file_loads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exhaustion.json");
    tokio::fs::write(&path, "{ definitely not").await.unwrap();

    let store = JsonFileRegistryStore::new(&path);
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn empty_tier_list_is_rejected() {
    let result = BackendRouter::load(
        Vec::new(),
        Arc::new(MemoryRegistryStore::new()),
        Arc::new(ManualClock::new(now())),
        RouterConfig::default(),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn unusable_router_settings_are_rejected() {
    for config in [
        RouterConfig {
            call_timeout_secs: 0,
            ..RouterConfig::default()
        },
        RouterConfig {
            spacing_margin: 1e12,
            ..RouterConfig::default()
        },
    ] {
        let result = BackendRouter::load(
            two_tiers(),
            Arc::new(MemoryRegistryStore::new()),
            Arc::new(ManualClock::new(now())),
            config,
        )
        .await;
        assert!(result.is_err());
    }
}
