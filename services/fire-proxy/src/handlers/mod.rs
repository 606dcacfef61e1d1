//! HTTP request handlers for the fire proxy.

pub mod analytics;
pub mod assets;
pub mod cache;
pub mod fires;
pub mod geocode;
pub mod health;
pub mod locations;
pub mod nasa;
pub mod tiles;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use fire_cache::{CACHED_DATE_HEADER, CACHE_STATUS_HEADER};
use fire_common::FireError;
use firms::UpstreamResponse;

/// Headers copied from an upstream response to the client.
const FORWARDED_HEADERS: [&str; 5] = [
    "content-type",
    "cache-control",
    "etag",
    CACHE_STATUS_HEADER,
    CACHED_DATE_HEADER,
];

/// Relay an upstream response to the client.
pub(crate) fn relay(upstream: UpstreamResponse) -> Response {
    if let Some(status) = upstream.header(CACHE_STATUS_HEADER) {
        crate::metrics::record_cache_status(status);
    }

    let mut response = Response::new(Body::from(upstream.body.clone()));
    *response.status_mut() = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let headers = response.headers_mut();
    for name in FORWARDED_HEADERS {
        if let Some(value) = upstream.header(name).and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(name, value);
        }
    }
    if !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
    }
    response
}

/// Relay a successful upstream response; anything else becomes an error
/// carrying the upstream status.
pub(crate) fn relay_success(upstream: UpstreamResponse, name: &'static str) -> Result<Response, FireError> {
    match upstream.error_for_status() {
        Ok(resp) => Ok(relay(resp)),
        Err(e) => {
            crate::metrics::record_upstream_failure(name);
            Err(e.into())
        }
    }
}

/// Parse a required numeric query parameter.
pub(crate) fn required_f64(name: &str, raw: Option<&str>) -> Result<f64, FireError> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FireError::MissingParameter(name.to_string()))?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FireError::InvalidParameter {
            param: name.to_string(),
            message: format!("'{}' is not a number", raw),
        })
}
