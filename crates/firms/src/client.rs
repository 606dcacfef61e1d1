//! FIRMS area API client.
//!
//! Builds `<base>/api/area/csv/<key>/<source>/<area>/<days>` URLs, injects the
//! MAP_KEY, and fetches through the retry wrapper.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use fire_common::{FireError, FireEvent, Viewport};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::csv::parse_firms_csv;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::transport::{
    FetchError, Upstream, UpstreamRequest, CACHED_DATE_HEADER, CACHE_STATUS_HEADER,
};

/// Default public FIRMS endpoint.
pub const DEFAULT_FIRMS_BASE_URL: &str = "https://firms.modaps.eosdis.nasa.gov";

/// Maximum day range accepted by the FIRMS area API.
pub const MAX_DAYS: u8 = 10;

/// FIRMS satellite product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FirmsSource {
    ModisNrt,
    ModisSp,
    ViirsSnppNrt,
    ViirsSnppSp,
    ViirsNoaa20Nrt,
    ViirsNoaa21Nrt,
}

impl FirmsSource {
    pub const ALL: [FirmsSource; 6] = [
        FirmsSource::ModisNrt,
        FirmsSource::ModisSp,
        FirmsSource::ViirsSnppNrt,
        FirmsSource::ViirsSnppSp,
        FirmsSource::ViirsNoaa20Nrt,
        FirmsSource::ViirsNoaa21Nrt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FirmsSource::ModisNrt => "MODIS_NRT",
            FirmsSource::ModisSp => "MODIS_SP",
            FirmsSource::ViirsSnppNrt => "VIIRS_SNPP_NRT",
            FirmsSource::ViirsSnppSp => "VIIRS_SNPP_SP",
            FirmsSource::ViirsNoaa20Nrt => "VIIRS_NOAA20_NRT",
            FirmsSource::ViirsNoaa21Nrt => "VIIRS_NOAA21_NRT",
        }
    }
}

impl fmt::Display for FirmsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FirmsSource {
    type Err = FirmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|src| src.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FirmsError::InvalidSource(s.to_string()))
    }
}

/// Region selector for the area API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Area {
    World,
    Usa,
    Bbox(Viewport),
}

impl Area {
    /// Path segment sent to FIRMS.
    pub fn to_path_segment(&self) -> String {
        match self {
            Area::World => "world".to_string(),
            Area::Usa => Viewport::usa().to_area_string(),
            Area::Bbox(vp) => vp.to_area_string(),
        }
    }
}

impl FromStr for Area {
    type Err = FirmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "world" => Ok(Area::World),
            "usa" => Ok(Area::Usa),
            other => Viewport::from_area_string(other)
                .map(Area::Bbox)
                .map_err(|e| FirmsError::InvalidArea(e.to_string())),
        }
    }
}

/// One FIRMS area request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirmsQuery {
    pub source: FirmsSource,
    pub area: Area,
    pub days: u8,
}

impl FirmsQuery {
    pub fn new(source: FirmsSource, area: Area, days: u8) -> Result<Self, FirmsError> {
        if !(1..=MAX_DAYS).contains(&days) {
            return Err(FirmsError::InvalidDays(days as u32));
        }
        Ok(Self { source, area, days })
    }

    /// Validate raw query-string values.
    pub fn parse(source: &str, area: &str, days: u32) -> Result<Self, FirmsError> {
        if !(1..=MAX_DAYS as u32).contains(&days) {
            return Err(FirmsError::InvalidDays(days));
        }
        Self::new(source.parse()?, area.parse()?, days as u8)
    }
}

/// FIRMS client errors.
#[derive(Debug, Error)]
pub enum FirmsError {
    #[error("FIRMS MAP_KEY is not configured")]
    MissingKey,

    #[error("Unknown FIRMS source '{0}'")]
    InvalidSource(String),

    #[error("Day range must be 1-10, got {0}")]
    InvalidDays(u32),

    #[error("Invalid area: {0}")]
    InvalidArea(String),

    #[error("FIRMS returned an unexpected body: {0}")]
    UnexpectedBody(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl From<FirmsError> for FireError {
    fn from(err: FirmsError) -> Self {
        match err {
            FirmsError::MissingKey => FireError::MissingConfiguration(
                "FIRMS MAP_KEY is not configured; set FIRMS_MAP_KEY".to_string(),
            ),
            FirmsError::InvalidSource(s) => FireError::InvalidParameter {
                param: "source".to_string(),
                message: format!("unknown source '{}'", s),
            },
            FirmsError::InvalidDays(d) => FireError::InvalidParameter {
                param: "days".to_string(),
                message: format!("must be 1-{}, got {}", MAX_DAYS, d),
            },
            FirmsError::InvalidArea(m) => FireError::InvalidParameter {
                param: "area".to_string(),
                message: m,
            },
            FirmsError::UnexpectedBody(m) => FireError::Upstream {
                status: 502,
                message: m,
            },
            FirmsError::Fetch(e) => e.into(),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmsConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub map_key: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for FirmsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FIRMS_BASE_URL.to_string(),
            map_key: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// FIRMS CSV text plus any cache markers a caching transport attached.
#[derive(Debug, Clone, PartialEq)]
pub struct FirmsCsv {
    pub text: String,
    pub cache_status: Option<String>,
    pub cached_date: Option<String>,
}

impl FirmsCsv {
    /// True when the body is an expired cached copy served because FIRMS
    /// could not be reached.
    pub fn is_stale(&self) -> bool {
        self.cache_status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("stale"))
    }

    pub fn events(&self) -> Vec<FireEvent> {
        parse_firms_csv(&self.text)
    }
}

/// NASA FIRMS area API client.
pub struct FirmsClient {
    upstream: Arc<dyn Upstream>,
    config: FirmsConfig,
}

impl FirmsClient {
    pub fn new(upstream: Arc<dyn Upstream>, config: FirmsConfig) -> Self {
        Self { upstream, config }
    }

    pub fn has_key(&self) -> bool {
        self.config
            .map_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    /// Full area CSV URL including the key.
    pub fn area_url(&self, query: &FirmsQuery) -> Result<String, FirmsError> {
        let key = self
            .config
            .map_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(FirmsError::MissingKey)?;

        Ok(format!(
            "{}/api/area/csv/{}/{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            key,
            query.source,
            query.area.to_path_segment(),
            query.days
        ))
    }

    /// Fetch raw CSV text, retrying on network errors and non-2xx statuses.
    ///
    /// Only the final attempt lets a caching transport fall back to a stored
    /// copy, so transient failures are retried first.
    #[instrument(skip(self), fields(source = %query.source, days = query.days))]
    pub async fn fetch_csv(&self, query: &FirmsQuery) -> Result<FirmsCsv, FirmsError> {
        let url = match self.area_url(query) {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "FIRMS request rejected: missing configuration");
                return Err(e);
            }
        };

        let attempts = self.config.retry.attempts();
        let response = retry_with_backoff(&self.config.retry, |attempt| {
            let request = UpstreamRequest::get(url.clone());
            let request = if attempt < attempts {
                request.without_fallback()
            } else {
                request
            };
            async move { self.upstream.send(request).await?.error_for_status() }
        })
        .await?;

        let text = String::from_utf8_lossy(&response.body).into_owned();
        validate_csv_body(&text)?;

        let csv = FirmsCsv {
            text,
            cache_status: response.header(CACHE_STATUS_HEADER).map(str::to_string),
            cached_date: response.header(CACHED_DATE_HEADER).map(str::to_string),
        };
        info!(
            bytes = csv.text.len(),
            cache_status = csv.cache_status.as_deref().unwrap_or("none"),
            "Fetched FIRMS CSV"
        );
        Ok(csv)
    }

    /// Fetch and translate into events.
    pub async fn fetch_events(&self, query: &FirmsQuery) -> Result<Vec<FireEvent>, FirmsError> {
        Ok(self.fetch_csv(query).await?.events())
    }
}

/// FIRMS reports key and quota problems as 200 responses with a plain-text
/// message instead of a CSV header.
fn validate_csv_body(text: &str) -> Result<(), FirmsError> {
    let first_line = text.lines().next().unwrap_or("").trim();
    let names_latitude = first_line
        .split(',')
        .any(|h| matches!(h.trim().to_ascii_lowercase().as_str(), "latitude" | "lat"));
    if first_line.is_empty() || names_latitude {
        Ok(())
    } else {
        Err(FirmsError::UnexpectedBody(first_line.chars().take(200).collect()))
    }
}
