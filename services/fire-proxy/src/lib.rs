//! Fire Proxy Service Library
//!
//! HTTP edge proxy for the wildfire map. It hides third-party API keys,
//! applies per-client rate limiting and routes every outbound call through
//! the multi-strategy response cache.

pub mod config;
pub mod error;
pub mod fire_service;
pub mod handlers;
pub mod metrics;
pub mod rate_limit;
pub mod server;
pub mod state;
