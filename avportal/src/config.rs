//! Configuration for the AV Portal client
//!
//! The client never reaches for ambient/global settings: an
//! [`AvPortalConfig`] snapshot is injected at construction time. Every cached
//! response is tagged with [`SETTINGS_CACHE_TAG`], so a configuration change
//! can invalidate the whole response cache in one call (see
//! [`AvPortalClient::invalidate_cached_responses`]).
//!
//! [`AvPortalClient::invalidate_cached_responses`]: crate::AvPortalClient::invalidate_cached_responses

use anyhow::Context;
use avportalcache::Expiry;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cache tag carried by every cached AV Portal response.
///
/// Invalidating this tag models "the owning configuration changed, assume
/// all cached responses stale". Even a no-op settings save should do it.
pub const SETTINGS_CACHE_TAG: &str = "avportal.settings";

/// Default search endpoint of the AV Portal service
pub const DEFAULT_CLIENT_API_URI: &str = "https://ec.europa.eu/avservices/api/search";

/// Default base URI photo paths are relative to
pub const DEFAULT_PHOTOS_BASE_URI: &str =
    "https://ec.europa.eu/avservices/avs/files/video6/repository/prod/photo/store/";

/// Default cache lifetime for query responses (one day)
pub const DEFAULT_CACHE_MAX_AGE_SECS: i64 = 86400;

/// Default site language, used for title and video thumbnail fallback
pub const DEFAULT_LANGCODE: &str = "EN";

/// Lifetime policy for cached query responses
///
/// Serialized as the conventional integer encoding: `0` disables caching,
/// a negative value is the permanent sentinel, a positive value is a TTL in
/// seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum CacheMaxAge {
    /// Responses are never cached
    Disabled,
    /// Cached responses never expire until explicitly invalidated
    Permanent,
    /// Cached responses expire after this many seconds
    Seconds(u64),
}

impl CacheMaxAge {
    /// The integer sentinel meaning "cache forever"
    pub const PERMANENT: i64 = -1;

    pub fn is_enabled(&self) -> bool {
        !matches!(self, CacheMaxAge::Disabled)
    }

    /// Expiration to apply to a freshly cached response, `None` when caching
    /// is disabled.
    pub fn expiry(&self) -> Option<Expiry> {
        match self {
            CacheMaxAge::Disabled => None,
            CacheMaxAge::Permanent => Some(Expiry::Permanent),
            CacheMaxAge::Seconds(secs) => Some(Expiry::in_seconds(*secs)),
        }
    }
}

impl From<i64> for CacheMaxAge {
    fn from(value: i64) -> Self {
        match value {
            0 => CacheMaxAge::Disabled,
            v if v < 0 => CacheMaxAge::Permanent,
            v => CacheMaxAge::Seconds(v as u64),
        }
    }
}

impl From<CacheMaxAge> for i64 {
    fn from(value: CacheMaxAge) -> Self {
        match value {
            CacheMaxAge::Disabled => 0,
            CacheMaxAge::Permanent => CacheMaxAge::PERMANENT,
            CacheMaxAge::Seconds(secs) => secs as i64,
        }
    }
}

/// Settings consumed by [`AvPortalClient`]
///
/// [`AvPortalClient`]: crate::AvPortalClient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvPortalConfig {
    /// Search endpoint of the remote service
    pub client_api_uri: String,
    /// Base URI prefixed to relative photo/reportage paths
    pub photos_base_uri: String,
    /// Response cache lifetime
    pub cache_max_age: CacheMaxAge,
    /// Site default language, uppercased when building fallback chains
    pub default_langcode: String,
}

impl Default for AvPortalConfig {
    fn default() -> Self {
        Self {
            client_api_uri: DEFAULT_CLIENT_API_URI.to_string(),
            photos_base_uri: DEFAULT_PHOTOS_BASE_URI.to_string(),
            cache_max_age: CacheMaxAge::Seconds(DEFAULT_CACHE_MAX_AGE_SECS as u64),
            default_langcode: DEFAULT_LANGCODE.to_string(),
        }
    }
}

impl AvPortalConfig {
    /// Parse settings from a YAML document; absent keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid AV Portal configuration")
    }

    /// Load settings from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration file {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// The cache tag applied to responses cached under this configuration.
    pub fn cache_tag(&self) -> &'static str {
        SETTINGS_CACHE_TAG
    }
}
