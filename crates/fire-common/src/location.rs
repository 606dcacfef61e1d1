//! User-saved named map locations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named location the user saved for quick navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub created: DateTime<Utc>,
}

impl Location {
    /// Create a location with a fresh id and the current timestamp.
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            lat,
            lon,
            created: Utc::now(),
        }
    }

    /// Coordinates must be finite and within geographic range.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}
