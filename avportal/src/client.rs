//! AV Portal search API client
//!
//! This module provides the cache-aside client for the AV Portal REST
//! service: query options merged over fixed defaults, a deterministic cache
//! key over the fully merged parameter set, soft-failing network access, and
//! normalization of response documents into [`Resource`] objects.
//!
//! # Example
//!
//! ```no_run
//! use avportal::{AvPortalClient, AvPortalConfig};
//!
//! #[tokio::main]
//! async fn main() -> avportal::Result<()> {
//!     let client = AvPortalClient::new(AvPortalConfig::default())?;
//!
//!     if let Some(resource) = client.get_resource("I-162747").await? {
//!         println!("{}: {:?}", resource.reference(), resource.title("EN"));
//!     }
//!
//!     Ok(())
//! }
//! ```

use crate::config::AvPortalConfig;
use crate::error::{Error, Result};
use crate::resource::{AssetType, Resource};
use avportalcache::{MemoryCache, ResponseCache};
use indexmap::IndexMap;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Field list requested from the search endpoint
pub const DEFAULT_FIELD_LIST: &str =
    "type,ref,doc_ref,titles_json,duration,shootstartdate,media_json,mediaorder_json,summary_json,languages";

/// Default page size of search queries
pub const DEFAULT_PAGE_SIZE: u32 = 15;

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("avportal/", env!("CARGO_PKG_VERSION"));

/// Namespace prefix of response cache keys
const CACHE_KEY_PREFIX: &str = "avportal:client:query:";

/// Query parameters merged over the client defaults.
///
/// Backed by a sorted map, so two option sets with the same keys and values
/// produce the same canonical form regardless of insertion order; the cache
/// key depends on it. Caller-supplied keys unknown to the defaults (`ref`,
/// diagnostic parameters, ...) are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    params: BTreeMap<String, String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options selecting a single resource by reference
    pub fn for_ref(reference: &str) -> Self {
        Self::new().with("ref", reference)
    }

    /// Builder-style parameter insertion
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.params.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.params.iter()
    }

    /// The fixed parameter set every query starts from
    fn defaults() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("fl".to_string(), DEFAULT_FIELD_LIST.to_string()),
            ("hasMedia".to_string(), "1".to_string()),
            ("wt".to_string(), "json".to_string()),
            ("index".to_string(), "1".to_string()),
            ("pagesize".to_string(), DEFAULT_PAGE_SIZE.to_string()),
            ("type".to_string(), AssetType::allowed_list()),
        ])
    }
}

/// Outcome of a search query: total hit count plus the page of resources,
/// keyed by reference in response order.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub num_found: u64,
    pub resources: IndexMap<String, Resource>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, reference: &str) -> Option<&Resource> {
        self.resources.get(reference)
    }
}

/// Client for the AV Portal search and media endpoints
///
/// Stateless façade over an HTTP client and a response cache; dependencies
/// are injected at construction time (see [`AvPortalClientBuilder`]), so the
/// client can be exercised deterministically against a mock server and an
/// in-memory cache.
pub struct AvPortalClient {
    http: reqwest::Client,
    config: AvPortalConfig,
    cache: Arc<dyn ResponseCache>,
    use_cache: bool,
}

impl AvPortalClient {
    /// Creates a client with default HTTP settings and an in-memory cache.
    pub fn new(config: AvPortalConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Creates a builder for configuring the client
    pub fn builder() -> AvPortalClientBuilder {
        AvPortalClientBuilder::default()
    }

    /// The configuration snapshot this client was built with
    pub fn config(&self) -> &AvPortalConfig {
        &self.config
    }

    /// The response cache handle
    pub fn cache(&self) -> Arc<dyn ResponseCache> {
        self.cache.clone()
    }

    /// Queries the search endpoint with `options` merged over the defaults.
    ///
    /// An unsupported asset type in the `type` option fails with
    /// [`Error::InvalidAssetType`] before any network access. Transport
    /// failures, non-2xx statuses and undecodable bodies all degrade to an
    /// empty result, indistinguishable from a query with no matches.
    ///
    /// With `use_cache` (and caching enabled in the configuration), a live
    /// cached response for the exact merged option set short-circuits the
    /// network call; fresh non-empty responses are cached with the configured
    /// lifetime. With `use_cache` false the cache is neither read nor
    /// written.
    pub async fn query(&self, options: &QueryOptions, use_cache: bool) -> Result<QueryResult> {
        let merged = self.build_options(options)?;
        let use_cache = use_cache && self.use_cache;

        let cache_key = cache_key(&merged);
        if use_cache {
            if let Some(cached) = self.cache.get(&cache_key).await {
                debug!("Cache hit for {}", cache_key);
                return resources_from_response(&cached);
            }
        }

        let response = self.fetch(&merged).await;

        if use_cache && !is_empty_response(&response) {
            if let Some(expiry) = self.config.cache_max_age.expiry() {
                self.cache
                    .set(
                        &cache_key,
                        response.clone(),
                        expiry,
                        &[self.config.cache_tag().to_string()],
                    )
                    .await;
            }
        }

        resources_from_response(&response)
    }

    /// Fetches a single resource by reference.
    ///
    /// Returns `Ok(None)` both when the record does not exist and when the
    /// remote call failed; callers treat the two uniformly as "not found".
    pub async fn get_resource(&self, reference: &str) -> Result<Option<Resource>> {
        let mut result = self.query(&QueryOptions::for_ref(reference), true).await?;
        Ok(result.resources.shift_remove(reference))
    }

    /// Downloads the thumbnail image of a resource.
    ///
    /// Photo and reportage thumbnail paths are relative to the configured
    /// photos base URI; video thumbnail URLs come host-qualified from the
    /// service. Returns `None` when the resource has no thumbnail, on any
    /// transport failure, or on a non-200 status: uniformly "no thumbnail
    /// available", with a single attempt and no retries.
    pub async fn get_thumbnail(&self, resource: &Resource) -> Option<Vec<u8>> {
        let url = resource.thumbnail_url(&self.config.default_langcode)?;

        let url = match resource.asset_type() {
            Some(AssetType::Photo) | Some(AssetType::Reportage) => {
                format!("{}{}", self.config.photos_base_uri, url)
            }
            _ => url,
        };

        match self.http.get(&url).send().await {
            Ok(response) if response.status() == StatusCode::OK => match response.bytes().await {
                Ok(bytes) => Some(bytes.to_vec()),
                Err(error) => {
                    warn!("Failed to read thumbnail body from {}: {}", url, error);
                    None
                }
            },
            Ok(response) => {
                debug!("Thumbnail request to {} returned {}", url, response.status());
                None
            }
            Err(error) => {
                warn!("Thumbnail request to {} failed: {}", url, error);
                None
            }
        }
    }

    /// Drops every cached query response.
    ///
    /// Call this whenever the owning configuration is saved, even unchanged:
    /// previously cached responses are assumed stale.
    pub async fn invalidate_cached_responses(&self) {
        self.cache.invalidate_tag(self.config.cache_tag()).await;
    }

    /// Merges caller options over the defaults and validates the asset types.
    fn build_options(&self, options: &QueryOptions) -> Result<BTreeMap<String, String>> {
        let mut merged = QueryOptions::defaults();
        for (key, value) in options.iter() {
            merged.insert(key.clone(), value.clone());
        }

        let requested = merged.get("type").cloned().unwrap_or_default();
        if requested
            .split(',')
            .any(|asset_type| AssetType::parse(asset_type).is_none())
        {
            return Err(Error::InvalidAssetType {
                requested,
                allowed: AssetType::allowed_list(),
            });
        }

        Ok(merged)
    }

    /// One GET against the search endpoint; every failure mode degrades to
    /// `Value::Null` (logged, never propagated, never cached).
    async fn fetch(&self, merged: &BTreeMap<String, String>) -> Value {
        let params: Vec<(&str, &str)> = merged
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();

        debug!("GET {} with {} params", self.config.client_api_uri, params.len());

        let response = match self
            .http
            .get(&self.config.client_api_uri)
            .query(&params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!("AV Portal request failed: {}", error);
                return Value::Null;
            }
        };

        if !response.status().is_success() {
            warn!("AV Portal returned status {}", response.status());
            return Value::Null;
        }

        match response.json().await {
            Ok(value) => value,
            Err(error) => {
                warn!("AV Portal response is not valid JSON: {}", error);
                Value::Null
            }
        }
    }
}

/// Deterministic cache key over the canonical (sorted) merged option set.
///
/// Any difference in any parameter, including ones unknown to the defaults,
/// yields a distinct key; insertion order never does. Separator characters
/// inside names and values are escaped, so the mapping from option sets to
/// keys is injective: `{a: "1&b=2"}` and `{a: "1", b: "2"}` get different
/// keys.
fn cache_key(merged: &BTreeMap<String, String>) -> String {
    let mut key = String::from(CACHE_KEY_PREFIX);
    for (index, (name, value)) in merged.iter().enumerate() {
        if index > 0 {
            key.push('&');
        }
        push_escaped(&mut key, name);
        key.push('=');
        push_escaped(&mut key, value);
    }
    key
}

/// Escapes the key syntax (`&`, `=`) and the escape character itself, so a
/// separator inside a value can never read as a separator between
/// parameters.
fn push_escaped(key: &mut String, text: &str) {
    for character in text.chars() {
        match character {
            '%' => key.push_str("%25"),
            '&' => key.push_str("%26"),
            '=' => key.push_str("%3D"),
            c => key.push(c),
        }
    }
}

/// A response worth caching has actual content.
fn is_empty_response(response: &Value) -> bool {
    match response {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Builds the query result from a raw decoded envelope.
///
/// A missing `response`, a zero/absent `numFound` or missing `docs` all mean
/// "no results". A doc without a `ref` is a contract violation and surfaces
/// as [`Error::InvalidResource`].
fn resources_from_response(response: &Value) -> Result<QueryResult> {
    let payload = match response.get("response") {
        Some(payload) => payload,
        None => return Ok(QueryResult::empty()),
    };

    let num_found = payload
        .get("numFound")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let docs = payload.get("docs").and_then(Value::as_array);

    let docs = match (num_found, docs) {
        (0, _) | (_, None) => return Ok(QueryResult::empty()),
        (_, Some(docs)) => docs,
    };

    let mut resources = IndexMap::with_capacity(docs.len());
    for doc in docs {
        let resource = Resource::from_value(doc.clone())?;
        resources.insert(resource.reference().to_string(), resource);
    }

    Ok(QueryResult {
        num_found,
        resources,
    })
}

/// Builder for configuring an [`AvPortalClient`]
///
/// All dependencies are explicit: the HTTP client, the cache backend and the
/// `use_cache` override are injected here rather than resolved from any
/// ambient context.
pub struct AvPortalClientBuilder {
    config: AvPortalConfig,
    http: Option<reqwest::Client>,
    cache: Option<Arc<dyn ResponseCache>>,
    use_cache: bool,
    timeout: Duration,
    user_agent: String,
}

impl Default for AvPortalClientBuilder {
    fn default() -> Self {
        Self {
            config: AvPortalConfig::default(),
            http: None,
            cache: None,
            use_cache: true,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl AvPortalClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration snapshot
    pub fn config(mut self, config: AvPortalConfig) -> Self {
        self.config = config;
        self
    }

    /// Set a custom HTTP client (shared pools, proxies, ...)
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Set the response cache backend (defaults to an in-memory cache)
    pub fn cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Disable response caching for this client regardless of configuration
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<AvPortalClient> {
        let http = match self.http {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(self.timeout)
                .user_agent(&self.user_agent)
                .build()?,
        };

        // Caching is off when the configuration says so, whatever the flag.
        let use_cache = self.use_cache && self.config.cache_max_age.is_enabled();

        Ok(AvPortalClient {
            http,
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(MemoryCache::new())),
            config: self.config,
            use_cache,
        })
    }
}
