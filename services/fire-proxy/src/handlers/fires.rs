//! Viewport fire query handler.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    Json,
};
use fire_common::{FireError, Viewport};
use serde::Deserialize;

use super::required_f64;
use crate::error::ApiResult;
use crate::fire_service::ViewportFires;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct ViewportParams {
    pub north: Option<String>,
    pub south: Option<String>,
    pub east: Option<String>,
    pub west: Option<String>,
}

impl ViewportParams {
    fn viewport(&self) -> Result<Viewport, FireError> {
        let north = required_f64("north", self.north.as_deref())?;
        let south = required_f64("south", self.south.as_deref())?;
        let east = required_f64("east", self.east.as_deref())?;
        let west = required_f64("west", self.west.as_deref())?;
        Viewport::try_new(north, south, east, west)
            .map_err(|e| FireError::InvalidViewport(e.to_string()))
    }
}

/// GET /api/fires - Fire events inside the viewport, highest FRP first
pub async fn fires_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ViewportParams>,
) -> ApiResult<Json<ViewportFires>> {
    crate::metrics::record_request("fires");

    let viewport = params.viewport()?;
    let fires = state.fires.load_viewport(&viewport).await?;
    Ok(Json(fires))
}
