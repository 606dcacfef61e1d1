//! Multi-strategy HTTP response cache.
//!
//! Every outbound request is classified by URL into one of four strategies:
//!
//! | Strategy | Used for | Bucket |
//! |---|---|---|
//! | cache-first | static assets | `static` (7 day TTL) |
//! | stale-while-revalidate | map tiles, geocoding | `tiles` |
//! | network-first with fallback | FIRMS data | `fire-data` (30 min fresh) |
//! | network-only | analytics | none, failures become 204 |
//!
//! Anything else uses network-first with fallback into the `dynamic` bucket.
//!
//! ## Versioning
//!
//! Buckets are named `<version>-<kind>`. A new version is staged with
//! [`ResponseCache::install`] and takes effect on [`ResponseCache::activate`],
//! which deletes every bucket not carrying the current version prefix while
//! holding the bucket lock, so a rotation never leaves a partial purge.
//!
//! ## Eviction
//!
//! Each bucket is an LRU map bounded by entry count.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use firms::{FetchError, HttpMethod, Upstream, UpstreamRequest, UpstreamResponse};
pub use firms::{CACHED_DATE_HEADER, CACHE_STATUS_HEADER};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::control::{BucketStatus, PrefetchReport};

/// Caching strategy for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CacheFirst,
    StaleWhileRevalidate,
    NetworkFirstWithFallback,
    NetworkOnly,
}

/// Named cache partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BucketKind {
    Static,
    Dynamic,
    Tiles,
    FireData,
}

impl BucketKind {
    pub const ALL: [BucketKind; 4] = [
        BucketKind::Static,
        BucketKind::Dynamic,
        BucketKind::Tiles,
        BucketKind::FireData,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BucketKind::Static => "static",
            BucketKind::Dynamic => "dynamic",
            BucketKind::Tiles => "tiles",
            BucketKind::FireData => "fire-data",
        }
    }
}

/// Strategy and bucket chosen for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub strategy: Strategy,
    pub bucket: Option<BucketKind>,
}

const STATIC_EXTENSIONS: [&str; 10] = [
    ".js", ".css", ".png", ".jpg", ".jpeg", ".svg", ".ico", ".woff", ".woff2", ".html",
];

/// Classify a request URL.
pub fn classify(url: &str) -> Classification {
    let lower = url.to_ascii_lowercase();
    let path = lower
        .split(['?', '#'])
        .next()
        .unwrap_or(lower.as_str());

    let (strategy, bucket) = if ["/analytics", "google-analytics", "/collect"]
        .iter()
        .any(|p| lower.contains(p))
    {
        (Strategy::NetworkOnly, None)
    } else if ["firms.modaps.eosdis.nasa.gov", "/api/nasa/firms", "/api/area/"]
        .iter()
        .any(|p| lower.contains(p))
    {
        (Strategy::NetworkFirstWithFallback, Some(BucketKind::FireData))
    } else if ["/tiles/", "tile.openstreetmap.org", "/vt/", "/geocode"]
        .iter()
        .any(|p| lower.contains(p))
    {
        (Strategy::StaleWhileRevalidate, Some(BucketKind::Tiles))
    } else if STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        (Strategy::CacheFirst, Some(BucketKind::Static))
    } else {
        (Strategy::NetworkFirstWithFallback, Some(BucketKind::Dynamic))
    };

    Classification { strategy, bucket }
}

/// Response cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Version string prefixed to every bucket name.
    pub version: String,
    /// Maximum entries held per bucket.
    pub max_entries_per_bucket: usize,
    /// Age after which cache-first static entries are refetched.
    pub static_ttl_secs: u64,
    /// Age after which dynamic fallbacks are marked stale.
    pub dynamic_ttl_secs: u64,
    /// Age after which fire-data fallbacks are marked stale.
    pub fire_data_fresh_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
            max_entries_per_bucket: 2000,
            static_ttl_secs: 7 * 24 * 3600,
            dynamic_ttl_secs: 24 * 3600,
            fire_data_fresh_secs: 30 * 60,
        }
    }
}

impl CacheSettings {
    fn max_age(&self, bucket: BucketKind) -> Option<Duration> {
        match bucket {
            BucketKind::Static => Some(Duration::from_secs(self.static_ttl_secs)),
            BucketKind::Dynamic => Some(Duration::from_secs(self.dynamic_ttl_secs)),
            BucketKind::FireData => Some(Duration::from_secs(self.fire_data_fresh_secs)),
            BucketKind::Tiles => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    response: UpstreamResponse,
    cached_at: DateTime<Utc>,
}

impl CacheEntry {
    fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.cached_at).to_std().unwrap_or(Duration::ZERO)
    }

    fn is_younger_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) < max_age
    }

    fn size(&self) -> usize {
        self.response.body.len()
            + self
                .response
                .headers
                .iter()
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>()
    }
}

struct VersionState {
    current: String,
    pending: Option<String>,
}

/// Cache counters, readable without locks.
#[derive(Debug, Default)]
pub struct ResponseCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub stale_served: AtomicU64,
    pub revalidations: AtomicU64,
    pub network_failures: AtomicU64,
}

impl ResponseCacheStats {
    /// Cache hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) + self.stale_served.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

struct CacheInner {
    upstream: Arc<dyn Upstream>,
    settings: CacheSettings,
    buckets: Mutex<HashMap<String, LruCache<String, CacheEntry>>>,
    version: RwLock<VersionState>,
    stats: ResponseCacheStats,
}

/// HTTP response cache in front of an [`Upstream`].
///
/// Cloning is cheap; clones share buckets and counters. The cache itself
/// implements [`Upstream`] so clients can be stacked on top of it.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<CacheInner>,
}

impl ResponseCache {
    pub fn new(upstream: Arc<dyn Upstream>, settings: CacheSettings) -> Self {
        info!(
            version = %settings.version,
            max_entries_per_bucket = settings.max_entries_per_bucket,
            "Initializing response cache"
        );
        let current = settings.version.clone();
        Self {
            inner: Arc::new(CacheInner {
                upstream,
                settings,
                buckets: Mutex::new(HashMap::new()),
                version: RwLock::new(VersionState {
                    current,
                    pending: None,
                }),
                stats: ResponseCacheStats::default(),
            }),
        }
    }

    pub fn stats(&self) -> &ResponseCacheStats {
        &self.inner.stats
    }

    pub async fn current_version(&self) -> String {
        self.inner.version.read().await.current.clone()
    }

    // ------------------------------------------------------------------
    // Entry storage
    // ------------------------------------------------------------------
    //
    // Both paths hold the version read guard until the bucket lock is
    // released. `activate` takes the same locks in the same order, so an
    // entry can never land in a bucket that a rotation already purged.

    async fn lookup(&self, kind: BucketKind, url: &str) -> Option<CacheEntry> {
        let version = self.inner.version.read().await;
        let name = format!("{}-{}", version.current, kind.name());
        let mut buckets = self.inner.buckets.lock().await;
        buckets.get_mut(&name).and_then(|b| b.get(url).cloned())
    }

    async fn store(&self, kind: BucketKind, url: &str, response: &UpstreamResponse, cached_at: DateTime<Utc>) {
        let capacity = NonZeroUsize::new(self.inner.settings.max_entries_per_bucket.max(1))
            .unwrap_or(NonZeroUsize::MIN);

        let mut stamped = response.clone();
        stamped.set_header(CACHED_DATE_HEADER, cached_at.to_rfc3339());

        let version = self.inner.version.read().await;
        let name = format!("{}-{}", version.current, kind.name());
        let mut buckets = self.inner.buckets.lock().await;
        buckets
            .entry(name)
            .or_insert_with(|| LruCache::new(capacity))
            .put(
                url.to_string(),
                CacheEntry {
                    response: stamped,
                    cached_at,
                },
            );
    }

    /// Insert an entry with an explicit retrieval time.
    pub async fn put_with_timestamp(
        &self,
        kind: BucketKind,
        url: &str,
        response: UpstreamResponse,
        cached_at: DateTime<Utc>,
    ) {
        self.store(kind, url, &response, cached_at).await;
    }

    /// Cached response for a URL in the current version's bucket.
    pub async fn cached(&self, kind: BucketKind, url: &str) -> Option<UpstreamResponse> {
        self.lookup(kind, url).await.map(|e| e.response)
    }

    async fn network(&self, url: &str) -> Result<UpstreamResponse, FetchError> {
        let result = self.inner.upstream.send(UpstreamRequest::get(url)).await;
        if !matches!(&result, Ok(r) if r.is_success()) {
            self.inner.stats.network_failures.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn tagged(&self, mut response: UpstreamResponse, status: &str) -> UpstreamResponse {
        match status {
            "hit" => self.inner.stats.hits.fetch_add(1, Ordering::Relaxed),
            "stale" => self.inner.stats.stale_served.fetch_add(1, Ordering::Relaxed),
            _ => self.inner.stats.misses.fetch_add(1, Ordering::Relaxed),
        };
        response.set_header(CACHE_STATUS_HEADER, status);
        response
    }

    // ------------------------------------------------------------------
    // Strategies
    // ------------------------------------------------------------------

    /// Fetch a URL using the strategy its classification selects.
    pub async fn fetch(&self, url: &str) -> Result<UpstreamResponse, FetchError> {
        self.fetch_with(url, true).await
    }

    /// Like [`fetch`](Self::fetch); with `fallback` false a failed network
    /// call is returned instead of being answered from the cache.
    async fn fetch_with(&self, url: &str, fallback: bool) -> Result<UpstreamResponse, FetchError> {
        let Classification { strategy, bucket } = classify(url);
        debug!(url = %url, strategy = ?strategy, fallback = fallback, "Cache lookup");

        match (strategy, bucket) {
            (Strategy::CacheFirst, Some(kind)) => self.cache_first_with(kind, url, fallback).await,
            (Strategy::StaleWhileRevalidate, Some(kind)) => {
                self.stale_while_revalidate(kind, url).await.map(|(resp, _)| resp)
            }
            (Strategy::NetworkFirstWithFallback, Some(kind)) => {
                self.network_first(kind, url, fallback).await
            }
            _ => Ok(self.network_only(UpstreamRequest::get(url)).await),
        }
    }

    /// Serve a cached copy younger than the bucket TTL; otherwise fetch and
    /// store. If the fetch fails, an expired copy is better than nothing.
    pub async fn cache_first(&self, kind: BucketKind, url: &str) -> Result<UpstreamResponse, FetchError> {
        self.cache_first_with(kind, url, true).await
    }

    async fn cache_first_with(
        &self,
        kind: BucketKind,
        url: &str,
        fallback: bool,
    ) -> Result<UpstreamResponse, FetchError> {
        let now = Utc::now();
        let cached = self.lookup(kind, url).await;
        let max_age = self.inner.settings.max_age(kind);

        if let Some(entry) = &cached {
            if max_age.map_or(true, |ttl| entry.is_younger_than(ttl, now)) {
                return Ok(self.tagged(entry.response.clone(), "hit"));
            }
        }

        match self.network(url).await {
            Ok(resp) if resp.is_success() => {
                self.store(kind, url, &resp, Utc::now()).await;
                Ok(self.tagged(resp, "miss"))
            }
            other => match cached.filter(|_| fallback) {
                Some(entry) => {
                    warn!(url = %url, "Network failed, serving expired cache entry");
                    Ok(self.tagged(entry.response, "stale"))
                }
                None => other,
            },
        }
    }

    /// Serve any cached copy immediately and refresh it in the background.
    ///
    /// Returns the response plus the background refresh task, if one was
    /// spawned. Without a cached copy the fetch is awaited directly.
    pub async fn stale_while_revalidate(
        &self,
        kind: BucketKind,
        url: &str,
    ) -> Result<(UpstreamResponse, Option<JoinHandle<()>>), FetchError> {
        if let Some(entry) = self.lookup(kind, url).await {
            let cache = self.clone();
            let url_owned = url.to_string();
            let handle = tokio::spawn(async move {
                cache.revalidate(kind, &url_owned).await;
            });
            return Ok((self.tagged(entry.response, "hit"), Some(handle)));
        }

        let resp = self.network(url).await?;
        if resp.is_success() {
            self.store(kind, url, &resp, Utc::now()).await;
        }
        Ok((self.tagged(resp, "miss"), None))
    }

    async fn revalidate(&self, kind: BucketKind, url: &str) {
        self.inner.stats.revalidations.fetch_add(1, Ordering::Relaxed);
        match self.network(url).await {
            Ok(resp) if resp.is_success() => {
                self.store(kind, url, &resp, Utc::now()).await;
                debug!(url = %url, "Background revalidation stored fresh copy");
            }
            Ok(resp) => debug!(url = %url, status = resp.status, "Revalidation got non-success status"),
            Err(e) => debug!(url = %url, error = %e, "Revalidation failed"),
        }
    }

    /// Try the network first; on failure fall back to the cached copy,
    /// marked stale when older than the bucket's freshness window.
    pub async fn network_first_with_fallback(
        &self,
        kind: BucketKind,
        url: &str,
    ) -> Result<UpstreamResponse, FetchError> {
        self.network_first(kind, url, true).await
    }

    async fn network_first(
        &self,
        kind: BucketKind,
        url: &str,
        fallback: bool,
    ) -> Result<UpstreamResponse, FetchError> {
        let failure = match self.network(url).await {
            Ok(resp) if resp.is_success() => {
                self.store(kind, url, &resp, Utc::now()).await;
                return Ok(self.tagged(resp, "miss"));
            }
            other => other,
        };
        if !fallback {
            return failure;
        }

        match self.lookup(kind, url).await {
            Some(entry) => {
                let fresh = self
                    .inner
                    .settings
                    .max_age(kind)
                    .map_or(true, |ttl| entry.is_younger_than(ttl, Utc::now()));
                let status = if fresh { "hit" } else { "stale" };
                warn!(url = %url, cache_status = status, "Network failed, serving cached copy");
                Ok(self.tagged(entry.response, status))
            }
            None => failure,
        }
    }

    /// Forward without caching; any failure becomes an empty 204.
    pub async fn network_only(&self, request: UpstreamRequest) -> UpstreamResponse {
        match self.inner.upstream.send(request).await {
            Ok(resp) if resp.is_success() => resp,
            Ok(resp) => {
                debug!(status = resp.status, "Network-only request failed, answering 204");
                UpstreamResponse::new(204, Bytes::new())
            }
            Err(e) => {
                self.inner.stats.network_failures.fetch_add(1, Ordering::Relaxed);
                debug!(error = %e, "Network-only request failed, answering 204");
                UpstreamResponse::new(204, Bytes::new())
            }
        }
    }

    // ------------------------------------------------------------------
    // Versioning and control
    // ------------------------------------------------------------------

    /// Stage a new version; it takes effect on the next `activate`.
    pub async fn install(&self, version: impl Into<String>) {
        let version = version.into();
        info!(version = %version, "Staged response cache version");
        self.inner.version.write().await.pending = Some(version);
    }

    /// Switch to the staged version (if any) and delete every bucket not
    /// belonging to the current version. Returns the deleted bucket names.
    pub async fn activate(&self) -> Vec<String> {
        let mut version = self.inner.version.write().await;
        let mut buckets = self.inner.buckets.lock().await;

        if let Some(next) = version.pending.take() {
            info!(from = %version.current, to = %next, "Activating response cache version");
            version.current = next;
        }

        let prefix = format!("{}-", version.current);
        let stale: Vec<String> = buckets
            .keys()
            .filter(|name| !name.starts_with(&prefix))
            .cloned()
            .collect();
        for name in &stale {
            buckets.remove(name);
        }

        if !stale.is_empty() {
            info!(purged = stale.len(), "Purged old cache buckets");
        }
        stale
    }

    pub async fn pending_version(&self) -> Option<String> {
        self.inner.version.read().await.pending.clone()
    }

    /// Entry count and size per bucket, sorted by name.
    pub async fn bucket_status(&self) -> Vec<BucketStatus> {
        let buckets = self.inner.buckets.lock().await;
        let mut status: Vec<BucketStatus> = buckets
            .iter()
            .map(|(name, bucket)| BucketStatus {
                name: name.clone(),
                entries: bucket.len(),
                bytes: bucket.iter().map(|(_, e)| e.size()).sum(),
            })
            .collect();
        status.sort_by(|a, b| a.name.cmp(&b.name));
        status
    }

    /// Delete every bucket. Returns how many were removed.
    pub async fn clear(&self) -> usize {
        let mut buckets = self.inner.buckets.lock().await;
        let count = buckets.len();
        buckets.clear();
        info!(buckets = count, "Response cache cleared");
        count
    }

    /// Warm a set of URLs into `kind` via stale-while-revalidate, a few at
    /// a time. Already-cached URLs count as prefetched and get refreshed in
    /// the background.
    pub async fn prefetch(&self, kind: BucketKind, urls: Vec<String>) -> PrefetchReport {
        use futures::stream::{self, StreamExt};

        let results: Vec<bool> = stream::iter(urls)
            .map(|url| async move {
                matches!(
                    self.stale_while_revalidate(kind, &url).await,
                    Ok((resp, _)) if resp.is_success()
                )
            })
            .buffer_unordered(8)
            .collect()
            .await;

        let prefetched = results.iter().filter(|ok| **ok).count();
        PrefetchReport {
            prefetched,
            failed: results.len() - prefetched,
        }
    }
}

#[async_trait]
impl Upstream for ResponseCache {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, FetchError> {
        match request.method {
            HttpMethod::Get => self.fetch_with(&request.url, request.fallback).await,
            HttpMethod::Post if classify(&request.url).strategy == Strategy::NetworkOnly => {
                Ok(self.network_only(request).await)
            }
            HttpMethod::Post => self.inner.upstream.send(request).await,
        }
    }
}
