//! AV Portal client library
//!
//! This crate provides a Rust client for the European Commission AV Portal
//! search API, normalizing its heterogeneous video/photo/reportage records
//! into a uniform [`Resource`] value object.
//!
//! # Features
//!
//! - **Search queries**: caller options merged over the fixed parameter set,
//!   with asset-type validation before any network access
//! - **Response caching**: cache-aside over the full merged option set, with
//!   configurable TTL, a permanent lifetime sentinel, and tag-based bulk
//!   invalidation on configuration change
//! - **Resource normalization**: locale-aware title resolution with
//!   multi-level fallback, type-dependent thumbnail URL resolution,
//!   HTML cleanup and word-safe truncation
//! - **Thumbnail download**: raw image bytes with soft failure semantics
//!
//! # Example
//!
//! ```no_run
//! use avportal::{AvPortalClient, AvPortalConfig, QueryOptions};
//!
//! #[tokio::main]
//! async fn main() -> avportal::Result<()> {
//!     let client = AvPortalClient::new(AvPortalConfig::default())?;
//!
//!     // Search for photos only.
//!     let result = client
//!         .query(&QueryOptions::new().with("type", "PHOTO"), true)
//!         .await?;
//!     println!("{} resources found", result.num_found);
//!
//!     // Fetch a single resource and its thumbnail.
//!     if let Some(resource) = client.get_resource("I-162747").await? {
//!         println!("{:?}", resource.title("EN"));
//!         if let Some(bytes) = client.get_thumbnail(&resource).await {
//!             println!("thumbnail: {} bytes", bytes.len());
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Failure semantics
//!
//! The remote service is treated as unreliable: transport failures, non-2xx
//! statuses and undecodable bodies degrade to empty results and are never
//! cached. The only hard errors are caller mistakes: an unsupported asset
//! type in the query options, or a resource payload without a `ref`.

pub mod client;
pub mod config;
pub mod error;
pub mod resource;

// Re-exports
pub use client::{
    AvPortalClient, AvPortalClientBuilder, QueryOptions, QueryResult, DEFAULT_FIELD_LIST,
    DEFAULT_PAGE_SIZE,
};
pub use config::{AvPortalConfig, CacheMaxAge, SETTINGS_CACHE_TAG};
pub use error::{Error, Result};
pub use resource::{AssetType, Resource};

// The cache abstraction is part of the public surface: alternative backends
// implement `ResponseCache` and plug into the client builder.
pub use avportalcache::{Expiry, MemoryCache, ResponseCache};
