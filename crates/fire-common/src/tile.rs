//! Web Mercator XYZ tile coordinates.
//!
//! Used to enumerate the base-map tiles under a viewport for prefetching.

use serde::{Deserialize, Serialize};

use crate::Viewport;

/// Highest zoom level accepted for tile requests.
pub const MAX_ZOOM: u32 = 22;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Checked constructor: zoom within range, x/y within the zoom's matrix.
    pub fn try_new(z: u32, x: u32, y: u32) -> Option<Self> {
        if z > MAX_ZOOM {
            return None;
        }
        let n = 1u32 << z;
        (x < n && y < n).then_some(Self { z, x, y })
    }

    /// Fill a `{z}/{x}/{y}` URL template.
    pub fn fill_template(&self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

/// Convert lat/lon to Web Mercator tile coordinates, clamped to the matrix.
pub fn latlon_to_tile(lat: f64, lon: f64, zoom: u32) -> TileCoord {
    let n = (1u64 << zoom) as f64;
    let max_index = (n - 1.0).max(0.0);

    let lat = lat.clamp(-85.0511, 85.0511);
    let lon = lon.clamp(-180.0, 180.0);

    let x = ((lon + 180.0) / 360.0 * n).floor().clamp(0.0, max_index) as u32;
    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n)
        .floor()
        .clamp(0.0, max_index) as u32;

    TileCoord { z: zoom, x, y }
}

/// Convert Web Mercator tile coordinates to lat/lon bounds.
pub fn tile_to_viewport(coord: &TileCoord) -> Viewport {
    let n = (1u64 << coord.z) as f64;

    let west = coord.x as f64 / n * 360.0 - 180.0;
    let east = (coord.x + 1) as f64 / n * 360.0 - 180.0;

    let north = (std::f64::consts::PI * (1.0 - 2.0 * coord.y as f64 / n))
        .sinh()
        .atan()
        .to_degrees();
    let south = (std::f64::consts::PI * (1.0 - 2.0 * (coord.y + 1) as f64 / n))
        .sinh()
        .atan()
        .to_degrees();

    Viewport::new(north, south, east, west)
}

/// Tiles covering a viewport at `zoom`, row-major from the north-west
/// corner, truncated to `limit`. A viewport with `west > east` wraps across
/// the antimeridian.
pub fn tiles_covering(viewport: &Viewport, zoom: u32, limit: usize) -> Vec<TileCoord> {
    let zoom = zoom.min(MAX_ZOOM);
    let nw = latlon_to_tile(viewport.north, viewport.west, zoom);
    let se = latlon_to_tile(viewport.south, viewport.east, zoom);
    let last_col = (1u32 << zoom) - 1;

    let columns: Vec<u32> = if nw.x <= se.x {
        (nw.x..=se.x).collect()
    } else {
        (nw.x..=last_col).chain(0..=se.x).collect()
    };

    let mut tiles = Vec::new();
    for y in nw.y..=se.y {
        for &x in &columns {
            if tiles.len() >= limit {
                return tiles;
            }
            tiles.push(TileCoord { z: zoom, x, y });
        }
    }
    tiles
}
