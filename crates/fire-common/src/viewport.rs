//! Geographic viewport (the visible map bounding box).

use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees.
///
/// Used both as a spatial filter and, serialized, as the key for "data
/// already fetched for this region". Overlapping but non-identical viewports
/// produce different keys.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Viewport {
    /// Create a new viewport from its edges.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// The whole globe.
    pub fn world() -> Self {
        Self::new(90.0, -90.0, 180.0, -180.0)
    }

    /// Continental United States, as used for the `usa` area shortcut.
    pub fn usa() -> Self {
        Self::new(50.0, 24.0, -66.0, -125.0)
    }

    /// Build a viewport from raw edges, rejecting non-finite values and
    /// inverted latitudes.
    pub fn try_new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, ViewportParseError> {
        for (name, value) in [("north", north), ("south", south), ("east", east), ("west", west)] {
            if !value.is_finite() {
                return Err(ViewportParseError::InvalidNumber(format!("{}={}", name, value)));
            }
        }
        if south > north {
            return Err(ViewportParseError::Inverted { north, south });
        }
        Ok(Self::new(north, south, east, west))
    }

    /// Parse a FIRMS area string: "west,south,east,north".
    pub fn from_area_string(s: &str) -> Result<Self, ViewportParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(ViewportParseError::InvalidFormat(s.to_string()));
        }

        let parse = |p: &str| {
            p.parse::<f64>()
                .map_err(|_| ViewportParseError::InvalidNumber(p.to_string()))
        };

        let west = parse(parts[0])?;
        let south = parse(parts[1])?;
        let east = parse(parts[2])?;
        let north = parse(parts[3])?;
        Self::try_new(north, south, east, west)
    }

    /// Render as a FIRMS area string ("west,south,east,north").
    pub fn to_area_string(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }

    /// Exact-match cache key: "north,south,east,west".
    pub fn cache_key(&self) -> String {
        format!("{},{},{},{}", self.north, self.south, self.east, self.west)
    }

    /// Check if a point lies within the viewport (inclusive bounds).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let within_lon = if self.crosses_antimeridian() {
            lon >= self.west || lon <= self.east
        } else {
            lon >= self.west && lon <= self.east
        };
        lat >= self.south && lat <= self.north && within_lon
    }

    /// A viewport whose west edge lies east of its east edge wraps across
    /// the 180th meridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Clamp to valid web map latitude/longitude ranges.
    pub fn clamped(&self) -> Self {
        Self {
            north: self.north.clamp(-85.0511, 85.0511),
            south: self.south.clamp(-85.0511, 85.0511),
            east: self.east.clamp(-180.0, 180.0),
            west: self.west.clamp(-180.0, 180.0),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ViewportParseError {
    #[error("Invalid area format: {0}. Expected 'west,south,east,north'")]
    InvalidFormat(String),

    #[error("Invalid number in viewport: {0}")]
    InvalidNumber(String),

    #[error("South edge {south} is above north edge {north}")]
    Inverted { north: f64, south: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_area_string() {
        let vp = Viewport::from_area_string("-125.0,24.0,-66.0,50.0").unwrap();
        assert_eq!(vp.west, -125.0);
        assert_eq!(vp.south, 24.0);
        assert_eq!(vp.east, -66.0);
        assert_eq!(vp.north, 50.0);
    }

    #[test]
    fn test_cache_key_order() {
        let vp = Viewport::new(40.5, 30.0, -100.0, -120.25);
        assert_eq!(vp.cache_key(), "40.5,30,-100,-120.25");
    }
}
