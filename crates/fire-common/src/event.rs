//! Normalized fire detection records.

use serde::{Deserialize, Serialize};

/// A single satellite fire detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireEvent {
    pub latitude: f64,
    pub longitude: f64,
    /// Detection confidence, 0-100.
    pub confidence: i32,
    /// Fire radiative power in megawatts.
    pub frp: f64,
    /// Acquisition date, YYYY-MM-DD.
    pub acq_date: String,
    /// Acquisition time, HHMM UTC.
    pub acq_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satellite: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daynight: Option<String>,
}

/// Composite deduplication key: latitude, longitude, date and time joined
/// into one string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FireEvent {
    /// Create an event with only the required fields set.
    pub fn new(
        latitude: f64,
        longitude: f64,
        confidence: i32,
        frp: f64,
        acq_date: impl Into<String>,
        acq_time: impl Into<String>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            confidence,
            frp,
            acq_date: acq_date.into(),
            acq_time: acq_time.into(),
            brightness: None,
            satellite: None,
            instrument: None,
            daynight: None,
        }
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey(format!(
            "{},{},{},{}",
            self.latitude, self.longitude, self.acq_date, self.acq_time
        ))
    }

    /// FRP as a sortable value; NaN counts as zero.
    pub fn frp_or_zero(&self) -> f64 {
        if self.frp.is_nan() {
            0.0
        } else {
            self.frp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_ignores_intensity() {
        let a = FireEvent::new(34.05, -118.24, 80, 45.0, "2024-01-01", "1200");
        let mut b = a.clone();
        b.frp = 99.0;
        b.confidence = 10;
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_identity_key_differs_on_time() {
        let a = FireEvent::new(34.05, -118.24, 80, 45.0, "2024-01-01", "1200");
        let b = FireEvent::new(34.05, -118.24, 80, 45.0, "2024-01-01", "1201");
        assert_ne!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_optional_fields_skipped_in_json() {
        let event = FireEvent::new(1.0, 2.0, 50, 3.5, "2024-06-01", "0130");
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("brightness"));
        assert!(json.contains("\"acq_time\":\"0130\""));
    }
}
