//! Integration tests for the in-memory response cache

use avportalcache::{Expiry, MemoryCache, ResponseCache};
use chrono::{Duration, Utc};
use serde_json::json;

#[tokio::test]
async fn test_roundtrip() {
    let cache = MemoryCache::new();
    let payload = json!({"response": {"numFound": 2, "docs": []}});

    cache
        .set("query:a", payload.clone(), Expiry::in_seconds(3600), &[])
        .await;

    assert_eq!(cache.get("query:a").await, Some(payload));
    assert!(cache.get("query:b").await.is_none());
}

#[tokio::test]
async fn test_overwrite_replaces_value_and_expiry() {
    let cache = MemoryCache::new();
    let past = Expiry::At(Utc::now() - Duration::seconds(10));

    cache.set("k", json!("stale"), past, &[]).await;
    assert!(cache.get("k").await.is_none());

    cache.set("k", json!("fresh"), Expiry::Permanent, &[]).await;
    assert_eq!(cache.get("k").await, Some(json!("fresh")));
}

#[tokio::test]
async fn test_invalidate_tag_only_removes_tagged_entries() {
    let cache = MemoryCache::new();
    let settings_tag = vec!["avportal.settings".to_string()];

    cache
        .set("tagged:1", json!(1), Expiry::Permanent, &settings_tag)
        .await;
    cache
        .set("tagged:2", json!(2), Expiry::Permanent, &settings_tag)
        .await;
    cache
        .set("untagged", json!(3), Expiry::Permanent, &["other".to_string()])
        .await;

    cache.invalidate_tag("avportal.settings").await;

    assert!(cache.get("tagged:1").await.is_none());
    assert!(cache.get("tagged:2").await.is_none());
    assert_eq!(cache.get("untagged").await, Some(json!(3)));
}

#[tokio::test]
async fn test_clear() {
    let cache = MemoryCache::new();
    cache.set("a", json!(1), Expiry::Permanent, &[]).await;
    cache.set("b", json!(2), Expiry::in_seconds(60), &[]).await;

    cache.clear().await;

    assert_eq!(cache.entry_count().await, 0);
    assert!(cache.get("a").await.is_none());
}

#[tokio::test]
async fn test_ttl_entry_is_live_before_expiry() {
    let cache = MemoryCache::new();
    cache.set("k", json!("v"), Expiry::in_seconds(3600), &[]).await;
    assert_eq!(cache.get("k").await, Some(json!("v")));
}
