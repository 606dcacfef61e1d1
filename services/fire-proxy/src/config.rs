//! Proxy configuration loading and types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use fire_cache::CacheSettings;
use firms::{FirmsConfig, RetryPolicy, DEFAULT_FIRMS_BASE_URL};
use serde::{Deserialize, Serialize};

/// Proxy configuration, read from an optional YAML file with API keys taken
/// from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// FIRMS API root.
    pub firms_base_url: String,

    /// FIRMS MAP_KEY (env `FIRMS_MAP_KEY`).
    #[serde(skip_serializing)]
    pub firms_map_key: Option<String>,

    /// Base-map tile URL with `{z}`, `{x}` and `{y}` placeholders.
    pub tiles_url_template: String,

    /// Reverse-geocoding endpoint.
    pub geocode_url: String,

    /// Maps API key used for geocoding (env `GOOGLE_MAPS_API_KEY`).
    #[serde(skip_serializing)]
    pub maps_api_key: Option<String>,

    /// Analytics collector; analytics posts are dropped when unset.
    pub analytics_url: Option<String>,

    /// Origin serving the map's static assets under `/assets`.
    pub static_origin: Option<String>,

    /// FIRMS product used for viewport loads.
    pub default_source: String,

    /// Day range used for viewport loads.
    pub default_days: u8,

    /// Requests per minute allowed per client IP.
    pub rate_limit_per_minute: u32,

    /// Backoff policy for FIRMS calls.
    pub retry: RetryPolicy,

    /// Response cache settings.
    pub cache: CacheSettings,

    /// Refetch loaded viewports after this many seconds. Unset means a
    /// viewport is fetched once per process lifetime.
    pub viewport_refresh_secs: Option<u64>,

    /// JSON file holding saved locations.
    pub locations_path: PathBuf,

    /// Timeout for a single upstream request.
    pub request_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            firms_base_url: DEFAULT_FIRMS_BASE_URL.to_string(),
            firms_map_key: None,
            tiles_url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            geocode_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            maps_api_key: None,
            analytics_url: None,
            static_origin: None,
            default_source: "VIIRS_SNPP_NRT".to_string(),
            default_days: 1,
            rate_limit_per_minute: 120,
            retry: RetryPolicy::default(),
            cache: CacheSettings::default(),
            viewport_refresh_secs: None,
            locations_path: PathBuf::from("data/locations.json"),
            request_timeout_secs: 30,
        }
    }
}

impl ProxyConfig {
    /// Load from a YAML file, falling back to defaults when it does not
    /// exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read: {:?}", path))?;
            let config = Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse proxy config: {:?}", path))?;
            tracing::info!("Loaded proxy config from {:?}", path);
            config
        } else {
            tracing::warn!("Proxy config {:?} does not exist, using defaults", path);
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Secrets come from the environment when set there.
    pub fn apply_env(&mut self) {
        if let Some(key) = non_empty_env("FIRMS_MAP_KEY") {
            self.firms_map_key = Some(key);
        }
        if let Some(key) = non_empty_env("GOOGLE_MAPS_API_KEY") {
            self.maps_api_key = Some(key);
        }
    }

    pub fn firms_config(&self) -> FirmsConfig {
        FirmsConfig {
            base_url: self.firms_base_url.clone(),
            map_key: self.firms_map_key.clone(),
            retry: self.retry.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn viewport_refresh(&self) -> Option<Duration> {
        self.viewport_refresh_secs.map(Duration::from_secs)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
