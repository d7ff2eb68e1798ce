//! In-memory implementation of [`ResponseCache`]
//!
//! Entries live in a `HashMap` behind a `tokio::sync::RwLock`. Expiration is
//! lazy: stale entries are reported as misses on read and physically removed
//! by the next [`MemoryCache::evict_expired`] sweep or tag invalidation.

use crate::{Expiry, ResponseCache};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

struct Entry {
    value: Value,
    expiry: Expiry,
    tags: Vec<String>,
}

/// In-process response cache
///
/// Cheap to share behind an `Arc`; all interior mutability is handled by the
/// lock. Suitable for a single process; a multi-process deployment would
/// implement [`ResponseCache`] over a shared store instead.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, including not-yet-evicted stale ones.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Physically removes every expired entry.
    pub async fn evict_expired(&self) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.expiry.is_expired_at(now));
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!("Evicted {} expired cache entries", evicted);
        }
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.expiry.is_expired() {
            return None;
        }
        Some(entry.value.clone())
    }

    async fn set(&self, key: &str, value: Value, expiry: Expiry, tags: &[String]) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expiry,
                tags: tags.to_vec(),
            },
        );
    }

    async fn invalidate_tag(&self, tag: &str) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.tags.iter().any(|t| t == tag));
        debug!(
            "Invalidated {} cache entries tagged \"{}\"",
            before - entries.len(),
            tag
        );
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        let past = Expiry::At(Utc::now() - Duration::seconds(1));
        cache.set("k", json!(1), past, &[]).await;

        assert!(cache.get("k").await.is_none());
        // Lazy eviction: the stale entry is still physically present.
        assert_eq!(cache.entry_count().await, 1);

        cache.evict_expired().await;
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_permanent_entry_survives_eviction() {
        let cache = MemoryCache::new();
        cache.set("k", json!(1), Expiry::Permanent, &[]).await;
        cache.evict_expired().await;
        assert_eq!(cache.get("k").await, Some(json!(1)));
    }
}
