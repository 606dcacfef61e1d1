//! Error types for the wildfire map services.

use thiserror::Error;

/// Result type alias using FireError.
pub type FireResult<T> = Result<T, FireError>;

/// Primary error type surfaced to API clients.
#[derive(Debug, Error)]
pub enum FireError {
    // === Request Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Invalid viewport: {0}")]
    InvalidViewport(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    // === Configuration Errors ===
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    // === Upstream Errors ===
    #[error("Upstream returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Upstream unreachable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream request timed out")]
    Timeout,

    // === Storage Errors ===
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl FireError {
    /// Short machine-readable error name used in JSON error bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            FireError::MissingParameter(_) => "MissingParameter",
            FireError::InvalidParameter { .. } => "InvalidParameter",
            FireError::InvalidViewport(_) => "InvalidViewport",
            FireError::NotFound(_) => "NotFound",
            FireError::RateLimited => "RateLimited",
            FireError::MissingConfiguration(_) => "MissingConfiguration",
            FireError::Upstream { .. } => "UpstreamError",
            FireError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            FireError::Timeout => "UpstreamTimeout",
            FireError::StorageError(_) => "StorageError",
            FireError::InternalError(_) => "InternalError",
        }
    }

    /// Get the HTTP status code for this error.
    ///
    /// Upstream HTTP errors keep the upstream status; network failures map to
    /// 500 and timeouts to 504.
    pub fn http_status_code(&self) -> u16 {
        match self {
            FireError::MissingParameter(_)
            | FireError::InvalidParameter { .. }
            | FireError::InvalidViewport(_) => 400,

            FireError::NotFound(_) => 404,
            FireError::RateLimited => 429,

            FireError::Upstream { status, .. } => *status,
            FireError::Timeout => 504,

            _ => 500,
        }
    }
}

impl From<std::io::Error> for FireError {
    fn from(err: std::io::Error) -> Self {
        FireError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for FireError {
    fn from(err: serde_json::Error) -> Self {
        FireError::InternalError(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_is_propagated() {
        let err = FireError::Upstream {
            status: 403,
            message: "Invalid MAP_KEY".to_string(),
        };
        assert_eq!(err.http_status_code(), 403);
        assert_eq!(err.error_code(), "UpstreamError");
    }

    #[test]
    fn test_network_failures_map_to_server_errors() {
        assert_eq!(
            FireError::UpstreamUnavailable("connection refused".into()).http_status_code(),
            500
        );
        assert_eq!(FireError::Timeout.http_status_code(), 504);
        assert_eq!(
            FireError::MissingConfiguration("FIRMS_MAP_KEY".into()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(FireError::MissingParameter("lat".into()).http_status_code(), 400);
        assert_eq!(FireError::RateLimited.http_status_code(), 429);
        assert_eq!(FireError::NotFound("loc".into()).http_status_code(), 404);
    }
}
