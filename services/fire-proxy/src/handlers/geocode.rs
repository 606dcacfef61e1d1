//! Reverse geocoding proxy.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use fire_cache::BucketKind;
use fire_common::FireError;
use serde::Deserialize;
use tracing::error;

use super::{relay_success, required_f64};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct GeocodeParams {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

/// GET /api/geocode - Reverse geocode a point with the server-side maps key
pub async fn geocode_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<GeocodeParams>,
) -> ApiResult<Response> {
    crate::metrics::record_request("geocode");

    let lat = required_f64("lat", params.lat.as_deref())?;
    let lng = required_f64("lng", params.lng.as_deref())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(FireError::InvalidParameter {
            param: "lat/lng".to_string(),
            message: format!("({}, {}) is outside geographic range", lat, lng),
        }
        .into());
    }

    let Some(key) = state.config.maps_api_key.as_deref() else {
        error!("Geocode request rejected: GOOGLE_MAPS_API_KEY is not configured");
        return Err(FireError::MissingConfiguration(
            "Maps API key is not configured; set GOOGLE_MAPS_API_KEY".to_string(),
        )
        .into());
    };

    let url = format!(
        "{}?latlng={},{}&key={}",
        state.config.geocode_url, lat, lng, key
    );

    let (response, _refresh) = state
        .response_cache
        .stale_while_revalidate(BucketKind::Tiles, &url)
        .await
        .map_err(|e| {
            crate::metrics::record_upstream_failure("geocode");
            FireError::from(e)
        })?;

    Ok(relay_success(response, "geocode")?)
}
