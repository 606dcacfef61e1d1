//! Viewport data cache and merger.
//!
//! Keeps the accumulated set of fire events for everything the map has
//! looked at, plus two sets of exact viewport keys:
//! - `loaded`: viewports already fetched (no refetch until `refresh_after`)
//! - `loading`: viewports with a fetch in flight (duplicates return at once,
//!   and can [`wait_settled`](ViewportCache::wait_settled) for the result)
//!
//! Keys are the serialized viewport compared by string equality, so two
//! overlapping but different viewports both fetch; the merge step absorbs
//! the resulting duplicates.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use fire_common::{FireEvent, IdentityKey, Viewport};
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

/// Result of a viewport load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Fetched from upstream; `added` of `fetched` events were new.
    Loaded { fetched: usize, added: usize },
    /// This exact viewport was already fetched.
    AlreadyLoaded,
    /// A fetch for this exact viewport is in flight.
    AlreadyLoading,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewportCacheStats {
    pub events: usize,
    pub loaded_viewports: usize,
    pub loading_viewports: usize,
    pub fetches: u64,
    pub duplicates_dropped: u64,
    pub suppressed_loads: u64,
}

#[derive(Default)]
struct ViewportKeys {
    loaded: HashMap<String, Instant>,
    loading: HashSet<String>,
}

#[derive(Default)]
struct Counters {
    fetches: AtomicU64,
    duplicates_dropped: AtomicU64,
    suppressed_loads: AtomicU64,
}

/// Accumulated fire events keyed by the viewports they were fetched for.
pub struct ViewportCache {
    events: RwLock<Vec<FireEvent>>,
    keys: Mutex<ViewportKeys>,
    refresh_after: Option<Duration>,
    counters: Counters,
    /// Bumped whenever an in-flight load finishes, successfully or not.
    settled: watch::Sender<u64>,
}

enum Claim<'a> {
    Claimed(LoadingGuard<'a>),
    AlreadyLoaded,
    AlreadyLoading,
}

/// Holds a viewport key in the loading set. Dropping it without
/// `finish` (fetch error or cancelled task) releases the key unloaded.
struct LoadingGuard<'a> {
    cache: &'a ViewportCache,
    key: String,
    completed: bool,
}

impl LoadingGuard<'_> {
    fn finish(mut self) {
        self.completed = true;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        {
            let mut keys = self.cache.lock_keys();
            keys.loading.remove(&self.key);
            if self.completed {
                keys.loaded.insert(self.key.clone(), Instant::now());
            }
        }
        self.cache.settled.send_modify(|n| *n = n.wrapping_add(1));
    }
}

impl Default for ViewportCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ViewportCache {
    /// Create an empty cache. With `refresh_after` set, a loaded viewport
    /// becomes eligible for refetch once that much time has passed.
    pub fn new(refresh_after: Option<Duration>) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            keys: Mutex::new(ViewportKeys::default()),
            refresh_after,
            counters: Counters::default(),
            settled: watch::channel(0).0,
        }
    }

    fn lock_keys(&self) -> std::sync::MutexGuard<'_, ViewportKeys> {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn claim(&self, viewport: &Viewport) -> Claim<'_> {
        let key = viewport.cache_key();
        let mut keys = self.lock_keys();

        if keys.loading.contains(&key) {
            return Claim::AlreadyLoading;
        }
        if let Some(loaded_at) = keys.loaded.get(&key) {
            let stale = self
                .refresh_after
                .is_some_and(|ttl| loaded_at.elapsed() >= ttl);
            if !stale {
                return Claim::AlreadyLoaded;
            }
            keys.loaded.remove(&key);
        }

        keys.loading.insert(key.clone());
        Claim::Claimed(LoadingGuard {
            cache: self,
            key,
            completed: false,
        })
    }

    /// Load a viewport through `fetch` unless it is already loaded or
    /// loading. Fetched events are merged into the accumulated dataset.
    ///
    /// A fetch error leaves the viewport unloaded and is returned as-is.
    pub async fn load_with<F, Fut, E>(&self, viewport: &Viewport, fetch: F) -> Result<LoadOutcome, E>
    where
        F: FnOnce(Viewport) -> Fut,
        Fut: Future<Output = Result<Vec<FireEvent>, E>>,
    {
        let guard = match self.claim(viewport) {
            Claim::Claimed(guard) => guard,
            Claim::AlreadyLoaded => return Ok(LoadOutcome::AlreadyLoaded),
            Claim::AlreadyLoading => {
                self.counters.suppressed_loads.fetch_add(1, Ordering::Relaxed);
                debug!(viewport = %viewport.cache_key(), "Viewport already loading, skipping");
                return Ok(LoadOutcome::AlreadyLoading);
            }
        };

        self.counters.fetches.fetch_add(1, Ordering::Relaxed);
        let events = fetch(*viewport).await?;
        let fetched = events.len();
        let added = self.merge(events).await;
        guard.finish();

        info!(
            viewport = %viewport.cache_key(),
            fetched = fetched,
            added = added,
            "Viewport loaded"
        );

        Ok(LoadOutcome::Loaded { fetched, added })
    }

    /// Append events whose identity key is not yet present. Returns the
    /// number appended.
    pub async fn merge(&self, incoming: Vec<FireEvent>) -> usize {
        let mut events = self.events.write().await;
        let mut seen: HashSet<IdentityKey> = events.iter().map(FireEvent::identity_key).collect();

        let before = events.len();
        let offered = incoming.len();
        for event in incoming {
            if seen.insert(event.identity_key()) {
                events.push(event);
            }
        }

        let added = events.len() - before;
        self.counters
            .duplicates_dropped
            .fetch_add((offered - added) as u64, Ordering::Relaxed);
        added
    }

    /// Events inside the region (inclusive bounds), in accumulation order.
    pub async fn events_in(&self, region: &Viewport) -> Vec<FireEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| region.contains(e.latitude, e.longitude))
            .cloned()
            .collect()
    }

    pub async fn all_events(&self) -> Vec<FireEvent> {
        self.events.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    pub fn is_loaded(&self, viewport: &Viewport) -> bool {
        self.lock_keys().loaded.contains_key(&viewport.cache_key())
    }

    pub fn is_loading(&self, viewport: &Viewport) -> bool {
        self.lock_keys().loading.contains(&viewport.cache_key())
    }

    /// Wait until no fetch for this exact viewport is in flight. Returns
    /// whether the viewport ended up loaded.
    pub async fn wait_settled(&self, viewport: &Viewport) -> bool {
        let key = viewport.cache_key();
        let mut settled = self.settled.subscribe();
        loop {
            {
                let keys = self.lock_keys();
                if !keys.loading.contains(&key) {
                    return keys.loaded.contains_key(&key);
                }
            }
            if settled.changed().await.is_err() {
                return false;
            }
        }
    }

    /// Mark a loaded viewport as needing a refetch. Its events stay in the
    /// dataset.
    pub fn forget(&self, viewport: &Viewport) {
        self.lock_keys().loaded.remove(&viewport.cache_key());
    }

    /// Drop all events and loaded keys. In-flight loads still complete and
    /// merge.
    pub async fn clear(&self) {
        let mut events = self.events.write().await;
        events.clear();
        self.lock_keys().loaded.clear();
        info!("Viewport cache cleared");
    }

    pub async fn stats(&self) -> ViewportCacheStats {
        let events = self.events.read().await.len();
        let keys = self.lock_keys();
        ViewportCacheStats {
            events,
            loaded_viewports: keys.loaded.len(),
            loading_viewports: keys.loading.len(),
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            duplicates_dropped: self.counters.duplicates_dropped.load(Ordering::Relaxed),
            suppressed_loads: self.counters.suppressed_loads.load(Ordering::Relaxed),
        }
    }
}
