//! FIRMS area API passthrough.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use fire_cache::{CACHED_DATE_HEADER, CACHE_STATUS_HEADER};
use fire_common::FireError;
use firms::{FirmsError, FirmsQuery};
use serde::Deserialize;
use tracing::instrument;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct FirmsParams {
    pub source: Option<String>,
    pub days: Option<String>,
    pub area: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Csv,
    Json,
}

impl FirmsParams {
    fn query(&self, state: &AppState) -> Result<FirmsQuery, FireError> {
        let source = self
            .source
            .as_deref()
            .unwrap_or(&state.config.default_source);
        let area = self.area.as_deref().unwrap_or("world");
        let days = match self.days.as_deref().map(str::trim) {
            None | Some("") => state.config.default_days as u32,
            Some(raw) => raw.parse().map_err(|_| FireError::InvalidParameter {
                param: "days".to_string(),
                message: format!("'{}' is not a whole number", raw),
            })?,
        };
        Ok(FirmsQuery::parse(source, area, days)?)
    }

    fn format(&self) -> Result<OutputFormat, FireError> {
        match self.format.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("csv") => Ok(OutputFormat::Csv),
            Some("json") => Ok(OutputFormat::Json),
            Some(other) => Err(FireError::InvalidParameter {
                param: "format".to_string(),
                message: format!("'{}' is not csv or json", other),
            }),
        }
    }
}

/// GET /api/nasa/firms - FIRMS area data as CSV or a JSON event array
#[instrument(skip(state))]
pub async fn firms_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<FirmsParams>,
) -> ApiResult<Response> {
    crate::metrics::record_request("firms");

    let query = params.query(&state)?;
    let format = params.format()?;

    let csv = match state.firms.fetch_csv(&query).await {
        Ok(csv) => csv,
        Err(e) => {
            if matches!(e, FirmsError::Fetch(_) | FirmsError::UnexpectedBody(_)) {
                crate::metrics::record_upstream_failure("firms");
            }
            return Err(e.into());
        }
    };

    if csv.is_stale() {
        crate::metrics::record_upstream_failure("firms");
    }
    if let Some(status) = csv.cache_status.as_deref() {
        crate::metrics::record_cache_status(status);
    }

    let mut response = match format {
        OutputFormat::Csv => {
            ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv.text.clone()).into_response()
        }
        OutputFormat::Json => Json(csv.events()).into_response(),
    };

    // Cache markers tell the client when it is looking at an expired copy.
    let headers = response.headers_mut();
    for (name, value) in [
        (CACHE_STATUS_HEADER, csv.cache_status.as_deref()),
        (CACHED_DATE_HEADER, csv.cached_date.as_deref()),
    ] {
        if let Some(value) = value.and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(name, value);
        }
    }

    Ok(response)
}
