//! Analytics beacon forwarding.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use firms::UpstreamRequest;
use tracing::debug;

use super::relay;
use crate::state::AppState;

/// POST /api/analytics - Forward a beacon; never fails from the client's view
pub async fn analytics_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    crate::metrics::record_request("analytics");

    let Some(url) = state.config.analytics_url.as_deref() else {
        debug!("No analytics collector configured, dropping beacon");
        return StatusCode::NO_CONTENT.into_response();
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json");

    let response = state
        .response_cache
        .network_only(UpstreamRequest::post(url, content_type, body))
        .await;
    relay(response)
}
