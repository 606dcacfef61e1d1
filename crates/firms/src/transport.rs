//! Outbound HTTP transport.
//!
//! Every call the proxy makes to a third-party API goes through the
//! [`Upstream`] trait so that caching layers and test doubles can be stacked
//! in front of the real reqwest client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use fire_common::FireError;
use reqwest::{header, Client};
use thiserror::Error;
use tracing::debug;

/// Response header describing where a response came from:
/// `miss` (network), `hit` (fresh cache), `stale` (expired cache fallback).
pub const CACHE_STATUS_HEADER: &str = "x-cache-status";

/// Response header stamped with the retrieval time of a cached response.
pub const CACHED_DATE_HEADER: &str = "x-cached-date";

/// HTTP method for an upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A request to a third-party API.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: HttpMethod,
    pub url: String,
    pub content_type: Option<String>,
    pub body: Option<Bytes>,
    /// Whether a caching layer may answer a failed fetch with a stored copy.
    pub fallback: bool,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            content_type: None,
            body: None,
            fallback: true,
        }
    }

    pub fn post(url: impl Into<String>, content_type: impl Into<String>, body: Bytes) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            content_type: Some(content_type.into()),
            body: Some(body),
            fallback: true,
        }
    }

    /// Report failures as-is instead of falling back to a cached copy.
    pub fn without_fallback(mut self) -> Self {
        self.fallback = false;
        self
    }
}

/// A fully buffered upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Replace (or add) a header, matching names case-insensitively.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Convert a non-2xx response into an error.
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::Status {
                status: self.status,
                body: String::from_utf8_lossy(&self.body).chars().take(512).collect(),
            })
        }
    }
}

/// Failure of an upstream call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("upstream returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("upstream request timed out")]
    Timeout,
}

impl From<FetchError> for FireError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Status { status, body } => FireError::Upstream {
                status,
                message: body,
            },
            FetchError::Timeout => FireError::Timeout,
            FetchError::Network(m) => FireError::UpstreamUnavailable(m),
        }
    }
}

/// Transport for third-party HTTP APIs.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Perform the request. Non-2xx statuses are returned as `Ok`; callers
    /// decide whether they count as failures.
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, FetchError>;
}

/// reqwest-backed transport.
pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    pub fn new(request_timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .user_agent(concat!("fire-proxy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, FetchError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        if let Some(content_type) = &request.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(classify_reqwest_error)?;

        debug!(status = status, bytes = body.len(), "Upstream response received");

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let resp = UpstreamResponse::new(200, "ok").with_header("Content-Type", "text/csv");
        assert_eq!(resp.header("content-type"), Some("text/csv"));
    }

    #[test]
    fn test_set_header_replaces() {
        let mut resp = UpstreamResponse::new(200, "ok").with_header("X-Cache-Status", "miss");
        resp.set_header("x-cache-status", "hit");
        assert_eq!(resp.headers.len(), 1);
        assert_eq!(resp.header("X-Cache-Status"), Some("hit"));
    }

    #[test]
    fn test_error_for_status() {
        let err = UpstreamResponse::new(503, "down").error_for_status().unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                status: 503,
                body: "down".to_string()
            }
        );
        assert!(UpstreamResponse::new(204, "").error_for_status().is_ok());
    }
}
