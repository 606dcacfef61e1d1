//! Application state for the fire proxy.

use std::sync::Arc;

use anyhow::{Context, Result};
use fire_cache::{LocationStore, ResponseCache};
use firms::{Area, FirmsClient, FirmsQuery, FirmsSource, HttpUpstream, Upstream};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::ProxyConfig;
use crate::fire_service::FireDataService;
use crate::rate_limit::ClientRateLimiter;

/// Shared application state.
pub struct AppState {
    pub config: ProxyConfig,

    /// Every outbound call goes through this cache.
    pub response_cache: ResponseCache,

    /// FIRMS client layered over the response cache.
    pub firms: Arc<FirmsClient>,

    /// Viewport lazy loading over `firms`.
    pub fires: FireDataService,

    pub locations: LocationStore,

    pub limiter: ClientRateLimiter,

    /// Prometheus render handle; absent when no recorder is installed.
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state backed by the real HTTP transport.
    pub async fn new(config: ProxyConfig) -> Result<Self> {
        let upstream = HttpUpstream::new(config.request_timeout())
            .context("Failed to create upstream HTTP client")?;
        Self::with_upstream(config, Arc::new(upstream)).await
    }

    /// Create state over an arbitrary transport.
    pub async fn with_upstream(config: ProxyConfig, upstream: Arc<dyn Upstream>) -> Result<Self> {
        let source: FirmsSource = config
            .default_source
            .parse()
            .context("Invalid default_source")?;
        // Validates the day range up front.
        FirmsQuery::new(source, Area::World, config.default_days).context("Invalid default_days")?;

        let response_cache = ResponseCache::new(upstream, config.cache.clone());
        let firms = Arc::new(FirmsClient::new(
            Arc::new(response_cache.clone()),
            config.firms_config(),
        ));
        if !firms.has_key() {
            tracing::warn!("FIRMS_MAP_KEY is not set; fire data requests will fail with 500");
        }

        let fires = FireDataService::new(
            Arc::clone(&firms),
            source,
            config.default_days,
            config.viewport_refresh(),
        );

        let locations = LocationStore::open(&config.locations_path)
            .await
            .context("Failed to open saved locations")?;

        let limiter = ClientRateLimiter::per_minute(config.rate_limit_per_minute);

        Ok(Self {
            config,
            response_cache,
            firms,
            fires,
            locations,
            limiter,
            metrics_handle: None,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
