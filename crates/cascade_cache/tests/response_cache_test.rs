//! Tests for the TTL-aware response cache over both stores.

use cascade_cache::{CacheKey, CacheStore, FileCacheStore, MemoryCacheStore, ResponseCache};
use cascade_core::ManualClock;
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2025, 5, 10, 8, 0, 0).unwrap())
}

#[tokio::test]
async fn entries_expire_after_ttl_and_are_evicted() {
    let store = Arc::new(MemoryCacheStore::new());
    let clock = clock();
    let cache = ResponseCache::new(store.clone(), Arc::new(clock.clone()), Duration::hours(24));
    let key = CacheKey::derive(None, "prompt");

    cache.put(&key, "answer").await;
    clock.advance(Duration::hours(23));
    assert_eq!(cache.get(&key).await.as_deref(), Some("answer"));

    clock.advance(Duration::hours(2));
    assert_eq!(cache.get(&key).await, None);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn corrupt_entry_reads_as_absent() {
    let store = Arc::new(MemoryCacheStore::new());
    let cache = ResponseCache::new(store.clone(), Arc::new(clock()), Duration::hours(1));
    let key = CacheKey::derive(Some("gemini-2.5-pro"), "prompt");

    store
        .put_raw(key.as_str(), "{not json".to_string())
        .await
        .unwrap();
    assert_eq!(cache.get(&key).await, None);
}

#[tokio::test]
async fn quota_overflow_is_swallowed() {
    let store = Arc::new(MemoryCacheStore::with_quota(64));
    let cache = ResponseCache::new(store.clone(), Arc::new(clock()), Duration::hours(1));
    let key = CacheKey::derive(None, "big");

    cache.put(&key, &"x".repeat(1_000)).await;
    assert_eq!(cache.get(&key).await, None);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn disabled_cache_never_hits() {
    let cache = ResponseCache::disabled(Arc::new(clock()));
    let key = CacheKey::derive(None, "prompt");
    cache.put(&key, "answer").await;
    assert_eq!(cache.get(&key).await, None);
}

#[tokio::test]
async fn file_store_round_trips_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let clock = clock();
    let key = CacheKey::derive(None, "persist me");

    let first = ResponseCache::new(
        Arc::new(FileCacheStore::new(dir.path().join("cache"), None)),
        Arc::new(clock.clone()),
        Duration::hours(24),
    );
    first.put(&key, "kept").await;

    let second = ResponseCache::new(
        Arc::new(FileCacheStore::new(dir.path().join("cache"), None)),
        Arc::new(clock),
        Duration::hours(24),
    );
    assert_eq!(second.get(&key).await.as_deref(), Some("kept"));
}

#[tokio::test]
async fn file_store_enforces_quota_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCacheStore::new(dir.path(), Some(10));

    store.put_raw("aaaa", "123456".to_string()).await.unwrap();
    assert!(store.put_raw("bbbb", "123456".to_string()).await.is_err());
    store.put_raw("aaaa", "654321".to_string()).await.unwrap();

    assert_eq!(store.used_bytes().await.unwrap(), 6);
    assert_eq!(store.get_raw("bbbb").await.unwrap(), None);
}

#[tokio::test]
async fn file_store_rejects_path_like_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCacheStore::new(dir.path(), None);
    assert!(store.put_raw("../escape", "x".to_string()).await.is_err());
}
