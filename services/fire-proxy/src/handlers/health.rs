//! Health and metrics handlers.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fire_cache::ViewportCacheStats;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: &'static str,
    pub firms_key_configured: bool,
    pub maps_key_configured: bool,
    pub cache_version: String,
    pub cache_hit_rate: f64,
    pub viewports: ViewportCacheStats,
}

/// GET /health - Liveness plus a summary of configuration and caches
pub async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION"),
        firms_key_configured: state.firms.has_key(),
        maps_key_configured: state.config.maps_api_key.is_some(),
        cache_version: state.response_cache.current_version().await,
        cache_hit_rate: state.response_cache.stats().hit_rate(),
        viewports: state.fires.stats().await,
    })
}

/// GET /metrics - Prometheus metrics
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let body = state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}
