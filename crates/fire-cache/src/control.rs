//! Cache control commands and their replies.
//!
//! Commands arrive as JSON objects tagged by `type`:
//!
//! ```json
//! {"type": "PREFETCH_TILES", "bounds": {"north": 35, "south": 33, "east": -117, "west": -120}, "zoomLevel": 8}
//! ```

use fire_common::Viewport;
use serde::{Deserialize, Serialize};

/// A cache control command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheCommand {
    /// Activate a staged cache version immediately.
    SkipWaiting,
    /// Report the current version and per-bucket usage.
    GetCacheStatus,
    /// Delete every bucket.
    ClearCache,
    /// Warm the base-map tiles covering `bounds` at `zoom_level`.
    PrefetchTiles {
        bounds: Viewport,
        #[serde(rename = "zoomLevel")]
        zoom_level: u32,
    },
}

/// Usage of one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketStatus {
    pub name: String,
    pub entries: usize,
    pub bytes: usize,
}

/// Outcome of a prefetch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrefetchReport {
    pub prefetched: usize,
    pub failed: usize,
}

/// Reply to a cache control command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheReply {
    SkipWaiting {
        version: String,
        purged: Vec<String>,
    },
    CacheStatus {
        version: String,
        pending_version: Option<String>,
        buckets: Vec<BucketStatus>,
    },
    CacheCleared {
        cleared: usize,
    },
    TilesPrefetched {
        tiles: usize,
        #[serde(flatten)]
        report: PrefetchReport,
    },
}
