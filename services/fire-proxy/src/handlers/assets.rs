//! Static asset proxy.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::Response,
};
use fire_cache::BucketKind;
use fire_common::FireError;

use super::relay_success;
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /assets/*path - Map assets from the static origin, cache-first
pub async fn asset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<String>,
) -> ApiResult<Response> {
    crate::metrics::record_request("assets");

    let Some(origin) = state.config.static_origin.as_deref() else {
        return Err(FireError::NotFound(format!("asset '{}'", path)).into());
    };
    if path.split('/').any(|segment| segment == "..") {
        return Err(FireError::InvalidParameter {
            param: "path".to_string(),
            message: "parent segments are not allowed".to_string(),
        }
        .into());
    }

    let url = format!("{}/assets/{}", origin.trim_end_matches('/'), path.trim_start_matches('/'));
    let response = state
        .response_cache
        .cache_first(BucketKind::Static, &url)
        .await
        .map_err(|e| {
            crate::metrics::record_upstream_failure("static");
            FireError::from(e)
        })?;

    Ok(relay_success(response, "static")?)
}
