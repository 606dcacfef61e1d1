//! Response cache control endpoint.
//!
//! One command per request, e.g. `{"type": "GET_CACHE_STATUS"}`.

use std::sync::Arc;

use axum::{body::Bytes, extract::Extension, Json};
use fire_cache::{BucketKind, CacheCommand, CacheReply};
use fire_common::{tiles_covering, FireError, Viewport, MAX_ZOOM};
use tracing::info;

use crate::error::ApiResult;
use crate::state::AppState;

/// Most tiles a single prefetch command may request.
pub const MAX_PREFETCH_TILES: usize = 256;

/// POST /api/cache - Execute a cache control command
pub async fn cache_control_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<CacheReply>> {
    crate::metrics::record_request("cache");

    let command: CacheCommand =
        serde_json::from_slice(&body).map_err(|e| FireError::InvalidParameter {
            param: "command".to_string(),
            message: e.to_string(),
        })?;
    info!(command = ?command, "Cache control command");

    let cache = &state.response_cache;
    let reply = match command {
        CacheCommand::SkipWaiting => {
            let purged = cache.activate().await;
            CacheReply::SkipWaiting {
                version: cache.current_version().await,
                purged,
            }
        }
        CacheCommand::GetCacheStatus => CacheReply::CacheStatus {
            version: cache.current_version().await,
            pending_version: cache.pending_version().await,
            buckets: cache.bucket_status().await,
        },
        CacheCommand::ClearCache => CacheReply::CacheCleared {
            cleared: cache.clear().await,
        },
        CacheCommand::PrefetchTiles { bounds, zoom_level } => {
            let bounds = Viewport::try_new(bounds.north, bounds.south, bounds.east, bounds.west)
                .map_err(|e| FireError::InvalidViewport(e.to_string()))?;
            if zoom_level > MAX_ZOOM {
                return Err(FireError::InvalidParameter {
                    param: "zoomLevel".to_string(),
                    message: format!("must be 0-{}, got {}", MAX_ZOOM, zoom_level),
                }
                .into());
            }

            let urls: Vec<String> = tiles_covering(&bounds, zoom_level, MAX_PREFETCH_TILES)
                .iter()
                .map(|tile| tile.fill_template(&state.config.tiles_url_template))
                .collect();
            let tiles = urls.len();
            let report = cache.prefetch(BucketKind::Tiles, urls).await;
            CacheReply::TilesPrefetched { tiles, report }
        }
    };

    Ok(Json(reply))
}
