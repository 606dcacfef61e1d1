//! Saved location handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use fire_common::{FireError, Location};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// GET /api/locations - All saved locations
pub async fn list_locations_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<Vec<Location>> {
    crate::metrics::record_request("locations");
    Json(state.locations.list().await)
}

/// POST /api/locations - Save a location
pub async fn create_location_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Location>)> {
    crate::metrics::record_request("locations");

    let new: NewLocation = serde_json::from_slice(&body).map_err(|e| FireError::InvalidParameter {
        param: "location".to_string(),
        message: e.to_string(),
    })?;
    let location = state
        .locations
        .add(Location::new(new.name.trim(), new.lat, new.lon))
        .await?;

    tracing::info!(id = %location.id, name = %location.name, "Saved location");
    Ok((StatusCode::CREATED, Json(location)))
}

/// DELETE /api/locations/:id - Remove a saved location
pub async fn delete_location_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    crate::metrics::record_request("locations");

    if state.locations.remove(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(FireError::NotFound(format!("location '{}'", id)).into())
    }
}
