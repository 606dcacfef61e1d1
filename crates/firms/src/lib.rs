//! NASA FIRMS data access.
//!
//! Provides:
//! - CSV translation into normalized [`FireEvent`](fire_common::FireEvent) records
//! - Bounded exponential-backoff retry for upstream calls
//! - An [`Upstream`] transport abstraction with a reqwest implementation
//! - The FIRMS area API client and a small sample dataset for degraded mode

pub mod client;
pub mod csv;
pub mod retry;
pub mod sample;
pub mod transport;

pub use client::{
    Area, FirmsClient, FirmsCsv, FirmsConfig, FirmsError, FirmsQuery, FirmsSource, DEFAULT_FIRMS_BASE_URL,
    MAX_DAYS,
};
pub use csv::{parse_firms_csv, sort_by_frp_desc, ColumnLayout};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use sample::sample_events;
pub use transport::{
    FetchError, HttpMethod, HttpUpstream, Upstream, UpstreamRequest, UpstreamResponse,
    CACHED_DATE_HEADER, CACHE_STATUS_HEADER,
};
