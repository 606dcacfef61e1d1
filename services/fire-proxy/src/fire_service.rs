//! Viewport-driven fire data loading.
//!
//! Each map viewport is fetched from FIRMS at most once (while loaded),
//! merged into the accumulated dataset and answered from it. When FIRMS
//! stays unavailable after retries the service degrades: cached detections
//! for the region if there are any, otherwise the bundled sample set.
//!
//! A viewport answered from an expired FIRMS response is reported as
//! degraded and left unloaded so the next request tries FIRMS again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fire_cache::{LoadOutcome, ViewportCache, ViewportCacheStats};
use fire_common::{FireError, FireEvent, Viewport};
use firms::{sample_events, sort_by_frp_desc, Area, FirmsClient, FirmsError, FirmsQuery, FirmsSource};
use serde::Serialize;
use tracing::{info, warn};

/// Events for one viewport request.
#[derive(Debug, Clone, Serialize)]
pub struct ViewportFires {
    pub events: Vec<FireEvent>,
    pub total: usize,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ViewportFires {
    fn new(mut events: Vec<FireEvent>, degraded: bool, message: Option<&str>) -> Self {
        sort_by_frp_desc(&mut events);
        Self {
            total: events.len(),
            events,
            degraded,
            message: message.map(str::to_string),
        }
    }
}

pub struct FireDataService {
    firms: Arc<FirmsClient>,
    cache: ViewportCache,
    source: FirmsSource,
    days: u8,
    /// Viewport keys whose last load was an expired cached copy, with the
    /// copy's retrieval date.
    stale: Mutex<HashMap<String, String>>,
}

impl FireDataService {
    pub fn new(
        firms: Arc<FirmsClient>,
        source: FirmsSource,
        days: u8,
        refresh_after: Option<Duration>,
    ) -> Self {
        Self {
            firms,
            cache: ViewportCache::new(refresh_after),
            source,
            days,
            stale: Mutex::new(HashMap::new()),
        }
    }

    fn lock_stale(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.stale.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn stale_since(&self, viewport: &Viewport) -> Option<String> {
        self.lock_stale().get(&viewport.cache_key()).cloned()
    }

    /// Load `viewport` if needed and return the events inside it, sorted by
    /// FRP descending. A request for a viewport that is already loading
    /// waits for that load and shares its result.
    pub async fn load_viewport(&self, viewport: &Viewport) -> Result<ViewportFires, FireError> {
        let outcome = self
            .cache
            .load_with(viewport, |vp| async move {
                let query = FirmsQuery::new(self.source, Area::Bbox(vp), self.days)?;
                let csv = self.firms.fetch_csv(&query).await?;
                {
                    let mut stale = self.lock_stale();
                    if csv.is_stale() {
                        stale.insert(vp.cache_key(), csv.cached_date.clone().unwrap_or_default());
                    } else {
                        stale.remove(&vp.cache_key());
                    }
                }
                Ok::<_, FirmsError>(csv.events())
            })
            .await;

        match outcome {
            Ok(LoadOutcome::Loaded { .. }) => {
                if self.stale_since(viewport).is_some() {
                    crate::metrics::record_upstream_failure("firms");
                    warn!(viewport = %viewport.cache_key(), "FIRMS unavailable, serving expired copy");
                    self.cache.forget(viewport);
                }
                Ok(self.answer(viewport).await)
            }
            Ok(LoadOutcome::AlreadyLoaded) => Ok(self.answer(viewport).await),
            Ok(LoadOutcome::AlreadyLoading) => {
                if self.cache.wait_settled(viewport).await {
                    Ok(self.answer(viewport).await)
                } else {
                    Ok(self.degraded(viewport).await)
                }
            }
            Err(FirmsError::Fetch(e)) => {
                crate::metrics::record_upstream_failure("firms");
                warn!(viewport = %viewport.cache_key(), error = %e, "FIRMS unavailable, degrading");
                Ok(self.degraded(viewport).await)
            }
            Err(FirmsError::UnexpectedBody(body)) => {
                crate::metrics::record_upstream_failure("firms");
                warn!(viewport = %viewport.cache_key(), body = %body, "FIRMS rejected request, degrading");
                Ok(self.degraded(viewport).await)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Events for a settled viewport, degraded when they came from an
    /// expired copy.
    async fn answer(&self, viewport: &Viewport) -> ViewportFires {
        let events = self.cache.events_in(viewport).await;
        match self.stale_since(viewport) {
            Some(since) if since.is_empty() => ViewportFires::new(
                events,
                true,
                Some("Live fire data is unavailable; showing cached detections"),
            ),
            Some(since) => {
                let message = format!(
                    "Live fire data is unavailable; showing cached detections from {}",
                    since
                );
                ViewportFires::new(events, true, Some(&message))
            }
            None => ViewportFires::new(events, false, None),
        }
    }

    async fn degraded(&self, viewport: &Viewport) -> ViewportFires {
        let cached = self.cache.events_in(viewport).await;
        if !cached.is_empty() {
            return ViewportFires::new(
                cached,
                true,
                Some("Live fire data is unavailable; showing previously loaded detections"),
            );
        }

        info!("Serving sample fire data");
        ViewportFires::new(
            sample_events(),
            true,
            Some("Live fire data is unavailable; showing sample data"),
        )
    }

    pub async fn stats(&self) -> ViewportCacheStats {
        self.cache.stats().await
    }
}
