//! Caching and client-state storage for the wildfire map services.
//!
//! Provides:
//! - The viewport data cache: accumulated fire events, exact-key viewport
//!   bookkeeping and duplicate-fetch suppression
//! - The HTTP response cache: per-URL strategy selection over versioned,
//!   LRU-bounded buckets, plus its control commands
//! - A file-backed store for user-saved locations

pub mod control;
pub mod locations;
pub mod response_cache;
pub mod viewport_cache;

pub use control::{BucketStatus, CacheCommand, CacheReply, PrefetchReport};
pub use locations::{LocationStore, LocationStoreError};
pub use response_cache::{
    classify, BucketKind, CacheSettings, Classification, ResponseCache, ResponseCacheStats,
    Strategy, CACHED_DATE_HEADER, CACHE_STATUS_HEADER,
};
pub use viewport_cache::{LoadOutcome, ViewportCache, ViewportCacheStats};
