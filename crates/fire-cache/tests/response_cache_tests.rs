//! Tests for the response cache strategies, versioning and prefetch.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use fire_cache::{BucketKind, CacheSettings, ResponseCache, CACHED_DATE_HEADER, CACHE_STATUS_HEADER};
use firms::{
    Area, FetchError, FirmsClient, FirmsConfig, FirmsQuery, FirmsSource, RetryPolicy, Upstream,
    UpstreamRequest, UpstreamResponse,
};
use tokio::sync::{Mutex, Notify};

/// Transport with a switchable failure mode, a body that changes per call,
/// and an optional gate that holds requests until released.
struct MockUpstream {
    calls: AtomicUsize,
    failing: AtomicBool,
    status: Mutex<u16>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockUpstream {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            status: Mutex::new(200),
            gate: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn send(&self, _request: UpstreamRequest) -> Result<UpstreamResponse, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let gate = self.gate.lock().await.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Network("connection refused".into()));
        }
        let status = *self.status.lock().await;
        Ok(UpstreamResponse::new(status, format!("body-{}", n)))
    }
}

fn cache_with(upstream: Arc<MockUpstream>) -> ResponseCache {
    ResponseCache::new(upstream, CacheSettings::default())
}

fn body(resp: &UpstreamResponse) -> String {
    String::from_utf8_lossy(&resp.body).into_owned()
}

const STATIC_URL: &str = "https://app.example/assets/app.js";
const TILE_URL: &str = "https://a.tile.openstreetmap.org/5/5/12.png";
const FIRMS_URL: &str = "https://firms.modaps.eosdis.nasa.gov/api/area/csv/KEY/MODIS_NRT/world/1";
const ANALYTICS_URL: &str = "https://stats.example/analytics/event";

// ============================================================================
// Cache-first
// ============================================================================

#[tokio::test]
async fn test_cache_first_fresh_entry_skips_network() {
    let upstream = MockUpstream::new();
    let cache = cache_with(upstream.clone());
    let cached_at = Utc::now() - ChronoDuration::days(6);
    cache
        .put_with_timestamp(BucketKind::Static, STATIC_URL, UpstreamResponse::new(200, "old"), cached_at)
        .await;

    let resp = cache.fetch(STATIC_URL).await.unwrap();
    assert_eq!(body(&resp), "old");
    assert_eq!(resp.header(CACHE_STATUS_HEADER), Some("hit"));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_cache_first_expired_entry_fetches_once() {
    let upstream = MockUpstream::new();
    let cache = cache_with(upstream.clone());
    let cached_at = Utc::now() - ChronoDuration::days(8);
    cache
        .put_with_timestamp(BucketKind::Static, STATIC_URL, UpstreamResponse::new(200, "old"), cached_at)
        .await;

    let resp = cache.fetch(STATIC_URL).await.unwrap();
    assert_eq!(body(&resp), "body-1");
    assert_eq!(upstream.calls(), 1);

    // Refreshed entry now serves without network.
    let resp = cache.fetch(STATIC_URL).await.unwrap();
    assert_eq!(body(&resp), "body-1");
    assert_eq!(upstream.calls(), 1);
    assert!(resp.header(CACHED_DATE_HEADER).is_some());
}

#[tokio::test]
async fn test_cache_first_falls_back_to_expired_copy() {
    let upstream = MockUpstream::new();
    upstream.fail(true);
    let cache = cache_with(upstream.clone());
    let cached_at = Utc::now() - ChronoDuration::days(30);
    cache
        .put_with_timestamp(BucketKind::Static, STATIC_URL, UpstreamResponse::new(200, "old"), cached_at)
        .await;

    let resp = cache.fetch(STATIC_URL).await.unwrap();
    assert_eq!(body(&resp), "old");
    assert_eq!(resp.header(CACHE_STATUS_HEADER), Some("stale"));
}

#[tokio::test]
async fn test_cache_first_without_copy_propagates_error() {
    let upstream = MockUpstream::new();
    upstream.fail(true);
    let cache = cache_with(upstream);
    assert!(cache.fetch(STATIC_URL).await.is_err());
}

// ============================================================================
// Stale-while-revalidate
// ============================================================================

#[tokio::test]
async fn test_swr_returns_cached_while_refetch_in_flight() {
    let upstream = MockUpstream::new();
    let cache = cache_with(upstream.clone());
    let ancient = Utc::now() - ChronoDuration::days(365);
    cache
        .put_with_timestamp(BucketKind::Tiles, TILE_URL, UpstreamResponse::new(200, "tile-v1"), ancient)
        .await;

    let gate = Arc::new(Notify::new());
    *upstream.gate.lock().await = Some(gate.clone());

    let (resp, refresh) = cache
        .stale_while_revalidate(BucketKind::Tiles, TILE_URL)
        .await
        .unwrap();
    assert_eq!(body(&resp), "tile-v1");
    let refresh = refresh.expect("background refresh spawned");

    // Still the old copy while the refetch is held at the gate.
    assert_eq!(
        body(&cache.cached(BucketKind::Tiles, TILE_URL).await.unwrap()),
        "tile-v1"
    );

    gate.notify_one();
    refresh.await.unwrap();

    let updated = cache.cached(BucketKind::Tiles, TILE_URL).await.unwrap();
    assert_eq!(body(&updated), "body-1");
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_swr_without_copy_waits_for_network() {
    let upstream = MockUpstream::new();
    let cache = cache_with(upstream.clone());

    let (resp, refresh) = cache
        .stale_while_revalidate(BucketKind::Tiles, TILE_URL)
        .await
        .unwrap();
    assert_eq!(body(&resp), "body-1");
    assert!(refresh.is_none());
    assert!(cache.cached(BucketKind::Tiles, TILE_URL).await.is_some());
}

// ============================================================================
// Network-first with fallback
// ============================================================================

#[tokio::test]
async fn test_network_first_stores_success() {
    let upstream = MockUpstream::new();
    let cache = cache_with(upstream.clone());

    let resp = cache.fetch(FIRMS_URL).await.unwrap();
    assert_eq!(resp.header(CACHE_STATUS_HEADER), Some("miss"));

    upstream.fail(true);
    let resp = cache.fetch(FIRMS_URL).await.unwrap();
    assert_eq!(body(&resp), "body-1");
    assert_eq!(resp.header(CACHE_STATUS_HEADER), Some("hit"));
}

#[tokio::test]
async fn test_network_first_marks_old_fallback_stale() {
    let upstream = MockUpstream::new();
    upstream.fail(true);
    let cache = cache_with(upstream);
    let cached_at = Utc::now() - ChronoDuration::minutes(45);
    cache
        .put_with_timestamp(BucketKind::FireData, FIRMS_URL, UpstreamResponse::new(200, "csv"), cached_at)
        .await;

    let resp = cache.fetch(FIRMS_URL).await.unwrap();
    assert_eq!(body(&resp), "csv");
    assert_eq!(resp.header(CACHE_STATUS_HEADER), Some("stale"));
}

#[tokio::test]
async fn test_network_first_non_success_uses_fallback() {
    let upstream = MockUpstream::new();
    let cache = cache_with(upstream.clone());
    cache
        .put_with_timestamp(BucketKind::FireData, FIRMS_URL, UpstreamResponse::new(200, "csv"), Utc::now())
        .await;

    *upstream.status.lock().await = 503;
    let resp = cache.fetch(FIRMS_URL).await.unwrap();
    assert_eq!(body(&resp), "csv");
    assert_eq!(resp.header(CACHE_STATUS_HEADER), Some("hit"));
}

#[tokio::test]
async fn test_network_first_without_copy_propagates() {
    let upstream = MockUpstream::new();
    upstream.fail(true);
    let cache = cache_with(upstream);
    assert!(matches!(cache.fetch(FIRMS_URL).await, Err(FetchError::Network(_))));
}

// ============================================================================
// Network-only
// ============================================================================

#[tokio::test]
async fn test_analytics_failure_is_silent_204() {
    let upstream = MockUpstream::new();
    upstream.fail(true);
    let cache = cache_with(upstream);

    let resp = cache.fetch(ANALYTICS_URL).await.unwrap();
    assert_eq!(resp.status, 204);
    assert!(resp.body.is_empty());
}

#[tokio::test]
async fn test_analytics_never_cached() {
    let upstream = MockUpstream::new();
    let cache = cache_with(upstream.clone());
    cache.fetch(ANALYTICS_URL).await.unwrap();
    cache.fetch(ANALYTICS_URL).await.unwrap();
    assert_eq!(upstream.calls(), 2);
    assert!(cache.bucket_status().await.is_empty());
}

#[tokio::test]
async fn test_request_without_fallback_reports_failure() {
    let upstream = MockUpstream::new();
    let cache = cache_with(upstream.clone());
    cache.fetch(FIRMS_URL).await.unwrap();
    upstream.fail(true);

    let result = cache
        .send(UpstreamRequest::get(FIRMS_URL).without_fallback())
        .await;
    assert!(matches!(result, Err(FetchError::Network(_))));

    // The same request with fallback allowed still gets the stored copy.
    let resp = cache.send(UpstreamRequest::get(FIRMS_URL)).await.unwrap();
    assert_eq!(body(&resp), "body-1");
}

/// Transport that fails only on the listed call numbers (1-based) and
/// otherwise answers with a one-row CSV tagged by call number.
struct FlakyUpstream {
    calls: AtomicUsize,
    fail_on: Vec<usize>,
}

#[async_trait]
impl Upstream for FlakyUpstream {
    async fn send(&self, _request: UpstreamRequest) -> Result<UpstreamResponse, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&n) {
            return Err(FetchError::Network("connection reset".into()));
        }
        Ok(UpstreamResponse::new(200, format!("latitude,longitude\n{}.0,1.0\n", n)))
    }
}

fn firms_over_cache(upstream: Arc<FlakyUpstream>, max_attempts: u32) -> FirmsClient {
    let cache = cache_with_upstream(upstream);
    FirmsClient::new(
        Arc::new(cache),
        FirmsConfig {
            base_url: "https://firms.modaps.eosdis.nasa.gov".to_string(),
            map_key: Some("KEY".to_string()),
            retry: RetryPolicy {
                max_attempts,
                base_delay_ms: 1,
                max_delay_ms: 2,
                jitter: false,
            },
        },
    )
}

fn cache_with_upstream(upstream: Arc<dyn Upstream>) -> ResponseCache {
    ResponseCache::new(upstream, CacheSettings::default())
}

#[tokio::test]
async fn test_firms_retries_before_falling_back_to_cache() {
    let upstream = Arc::new(FlakyUpstream {
        calls: AtomicUsize::new(0),
        fail_on: vec![2],
    });
    let client = firms_over_cache(upstream.clone(), 3);
    let query = FirmsQuery::new(FirmsSource::ModisNrt, Area::World, 1).unwrap();

    let first = client.fetch_csv(&query).await.unwrap();
    assert_eq!(first.text, "latitude,longitude\n1.0,1.0\n");

    // Call 2 fails; the retry reaches the network again instead of taking
    // the stored copy.
    let second = client.fetch_csv(&query).await.unwrap();
    assert_eq!(second.text, "latitude,longitude\n3.0,1.0\n");
    assert_eq!(second.cache_status.as_deref(), Some("miss"));
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_firms_falls_back_after_retries_exhausted() {
    let upstream = Arc::new(FlakyUpstream {
        calls: AtomicUsize::new(0),
        fail_on: vec![2, 3, 4],
    });
    let client = firms_over_cache(upstream.clone(), 3);
    let query = FirmsQuery::new(FirmsSource::ModisNrt, Area::World, 1).unwrap();

    client.fetch_csv(&query).await.unwrap();
    let fallback = client.fetch_csv(&query).await.unwrap();
    assert_eq!(fallback.text, "latitude,longitude\n1.0,1.0\n");
    assert_eq!(fallback.cache_status.as_deref(), Some("hit"));
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 4);
}

// ============================================================================
// Versioning and control
// ============================================================================

#[tokio::test]
async fn test_activation_purges_all_old_buckets() {
    let upstream = MockUpstream::new();
    let cache = cache_with(upstream);
    cache.fetch(STATIC_URL).await.unwrap();
    cache.fetch(TILE_URL).await.unwrap();
    cache.fetch(FIRMS_URL).await.unwrap();
    assert_eq!(cache.bucket_status().await.len(), 3);

    cache.install("v2").await;
    // Staged only: old buckets still serve.
    assert_eq!(cache.current_version().await, "v1");
    assert_eq!(cache.bucket_status().await.len(), 3);

    let mut purged = cache.activate().await;
    purged.sort();
    assert_eq!(purged, vec!["v1-fire-data", "v1-static", "v1-tiles"]);
    assert_eq!(cache.current_version().await, "v2");
    assert!(cache.bucket_status().await.is_empty());

    // A second activation has nothing left to purge.
    assert!(cache.activate().await.is_empty());
}

#[tokio::test]
async fn test_new_entries_land_in_current_version() {
    let upstream = MockUpstream::new();
    let cache = cache_with(upstream);
    cache.install("v7").await;
    cache.activate().await;
    cache.fetch(TILE_URL).await.unwrap();

    let names: Vec<String> = cache.bucket_status().await.into_iter().map(|b| b.name).collect();
    assert_eq!(names, vec!["v7-tiles"]);
}

#[tokio::test]
async fn test_clear_and_prefetch() {
    let upstream = MockUpstream::new();
    let cache = cache_with(upstream.clone());

    let urls: Vec<String> = (0..4)
        .map(|x| format!("https://a.tile.openstreetmap.org/2/{}/1.png", x))
        .collect();
    let report = cache.prefetch(BucketKind::Tiles, urls).await;
    assert_eq!(report.prefetched, 4);
    assert_eq!(report.failed, 0);

    let status = cache.bucket_status().await;
    assert_eq!(status[0].entries, 4);
    assert!(status[0].bytes > 0);

    assert_eq!(cache.clear().await, 1);
    assert!(cache.bucket_status().await.is_empty());
}

#[tokio::test]
async fn test_lru_bound_per_bucket() {
    let upstream = MockUpstream::new();
    let cache = ResponseCache::new(
        upstream,
        CacheSettings {
            max_entries_per_bucket: 2,
            ..CacheSettings::default()
        },
    );
    for x in 0..5 {
        cache
            .fetch(&format!("https://a.tile.openstreetmap.org/3/{}/1.png", x))
            .await
            .unwrap();
    }
    assert_eq!(cache.bucket_status().await[0].entries, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rotation_never_leaves_old_version_buckets() {
    let upstream = MockUpstream::new();
    let cache = cache_with(upstream);

    let writers: Vec<_> = (0..8)
        .map(|w| {
            let cache = cache.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    let url = format!("https://a.tile.openstreetmap.org/4/{}/{}.png", w, i);
                    cache
                        .put_with_timestamp(BucketKind::Tiles, &url, UpstreamResponse::new(200, "tile"), Utc::now())
                        .await;
                }
            })
        })
        .collect();

    for v in 2..20 {
        cache.install(format!("v{}", v)).await;
        cache.activate().await;
        tokio::task::yield_now().await;
    }
    for writer in writers {
        writer.await.unwrap();
    }

    let current = cache.current_version().await;
    assert_eq!(current, "v19");
    for bucket in cache.bucket_status().await {
        assert!(
            bucket.name.starts_with("v19-"),
            "bucket {} outlived its version",
            bucket.name
        );
    }
}
