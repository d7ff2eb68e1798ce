//! Response cache for AV Portal query results
//!
//! This crate provides the cache abstraction used by the AV Portal client:
//! a key-value store for raw decoded JSON payloads, with per-entry expiration
//! and tag-based bulk invalidation.
//!
//! The client never depends on a concrete storage technology. Any backend
//! implementing [`ResponseCache`] can be plugged in; [`MemoryCache`] is the
//! default in-process implementation.
//!
//! # Example
//!
//! ```
//! use avportalcache::{Expiry, MemoryCache, ResponseCache};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache = MemoryCache::new();
//!
//! cache
//!     .set(
//!         "avportal:client:query:ref=I-162747",
//!         json!({"response": {"numFound": 1}}),
//!         Expiry::Permanent,
//!         &["avportal.settings".to_string()],
//!     )
//!     .await;
//!
//! assert!(cache.get("avportal:client:query:ref=I-162747").await.is_some());
//!
//! // A configuration change invalidates everything carrying the tag.
//! cache.invalidate_tag("avportal.settings").await;
//! assert!(cache.get("avportal:client:query:ref=I-162747").await.is_none());
//! # }
//! ```

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

pub use memory::MemoryCache;

/// Expiration policy of a cached entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// The entry never expires until explicitly invalidated
    Permanent,
    /// The entry expires at the given instant
    At(DateTime<Utc>),
}

impl Expiry {
    /// Expiry at `now + seconds`
    pub fn in_seconds(seconds: u64) -> Self {
        Expiry::At(Utc::now() + Duration::seconds(seconds as i64))
    }

    /// Whether the entry is stale at the given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiry::Permanent => false,
            Expiry::At(instant) => *instant <= now,
        }
    }

    /// Whether the entry is stale right now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Key-value cache with per-entry expiration and tag-based invalidation
///
/// Expired entries behave exactly like missing ones: `get` returns `None`.
/// `set` overwrites unconditionally. Both operations are atomic with respect
/// to each other, but the trait deliberately offers no single-flight
/// deduplication: two concurrent misses on the same key may both trigger the
/// expensive computation upstream.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Returns the live entry for `key`, or `None` on miss/expiry.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key` with the given expiration and tags.
    async fn set(&self, key: &str, value: Value, expiry: Expiry, tags: &[String]);

    /// Removes every entry carrying `tag`.
    async fn invalidate_tag(&self, tag: &str);

    /// Removes all entries.
    async fn clear(&self);
}
