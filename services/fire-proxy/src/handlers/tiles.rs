//! Base-map tile proxy.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::Response,
};
use fire_cache::BucketKind;
use fire_common::{FireError, TileCoord, MAX_ZOOM};

use super::relay_success;
use crate::error::ApiResult;
use crate::state::AppState;

fn parse_coord(name: &str, raw: &str) -> Result<u32, FireError> {
    raw.parse().map_err(|_| FireError::InvalidParameter {
        param: name.to_string(),
        message: format!("'{}' is not a tile index", raw),
    })
}

/// GET /api/tiles/:z/:x/:y - Cached base-map tile
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((z, x, y)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    crate::metrics::record_request("tiles");

    // Accept "12.png" style paths.
    let y = y.split('.').next().unwrap_or_default();
    let (z, x, y) = (parse_coord("z", &z)?, parse_coord("x", &x)?, parse_coord("y", y)?);
    let coord = TileCoord::try_new(z, x, y).ok_or_else(|| FireError::InvalidParameter {
        param: "tile".to_string(),
        message: format!("{}/{}/{} is outside the tile matrix (max zoom {})", z, x, y, MAX_ZOOM),
    })?;

    let url = coord.fill_template(&state.config.tiles_url_template);
    let (response, _refresh) = state
        .response_cache
        .stale_while_revalidate(BucketKind::Tiles, &url)
        .await
        .map_err(|e| {
            crate::metrics::record_upstream_failure("tiles");
            FireError::from(e)
        })?;

    Ok(relay_success(response, "tiles")?)
}
