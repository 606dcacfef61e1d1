//! Common test fixtures for wildfire map tests.
//!
//! This module provides pre-defined FIRMS payloads and viewports that
//! represent common scenarios the proxy handles.

/// FIRMS CSV payloads.
pub mod csv {
    /// MODIS area API header (14 columns).
    pub const MODIS_HEADER: &str = "latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_t31,frp,daynight";

    /// VIIRS area API header (14 columns).
    pub const VIIRS_HEADER: &str = "latitude,longitude,bright_ti4,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_ti5,frp,daynight";

    /// One Los Angeles detection.
    pub const SINGLE_ROW: &str = "latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_t31,frp,daynight
34.05,-118.24,330.5,1.0,1.0,2024-01-01,1200,Terra,MODIS,80,6.1NRT,290.1,45,D
";

    /// Three valid rows, unsorted by FRP.
    pub const THREE_ROWS: &str = "latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_t31,frp,daynight
34.05,-118.24,330.5,1.0,1.0,2024-01-01,1200,Terra,MODIS,80,6.1NRT,290.1,45,D
36.77,-119.41,345.0,1.1,1.0,2024-01-01,1305,Aqua,MODIS,92,6.1NRT,295.0,120.5,D
38.58,-121.49,310.2,1.0,1.0,2024-01-01,0945,Terra,MODIS,55,6.1NRT,285.3,7.25,N
";

    /// Mixed good and bad rows: non-numeric coordinates, short row, blank line.
    pub const MALFORMED_ROWS: &str = "latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_t31,frp,daynight
34.05,-118.24,330.5,1.0,1.0,2024-01-01,1200,Terra,MODIS,80,6.1NRT,290.1,45,D
abc,-118.24,330.5,1.0,1.0,2024-01-01,1201,Terra,MODIS,80,6.1NRT,290.1,45,D
34.06,,330.5,1.0,1.0,2024-01-01,1202,Terra,MODIS,80,6.1NRT,290.1,45,D
34.07,-118.25,330.5

36.77,-119.41,345.0,1.1,1.0,2024-01-01,1305,Aqua,MODIS,92,6.1NRT,295.0,bogus,D
";

    /// VIIRS row with a letter confidence class and a short time.
    pub const VIIRS_ROW: &str = "latitude,longitude,bright_ti4,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_ti5,frp,daynight
-33.86,151.20,367.1,0.39,0.36,2024-02-10,930,N20,VIIRS,h,2.0NRT,290.4,12.8,D
";

    /// Body FIRMS returns for a bad key (HTTP 200, not CSV).
    pub const INVALID_KEY_BODY: &str = "Invalid MAP_KEY.";
}

/// Viewport fixtures as (north, south, east, west).
pub mod viewport {
    /// Southern California.
    pub const SOCAL: (f64, f64, f64, f64) = (35.0, 32.5, -114.0, -121.0);

    /// Northern California, overlapping SOCAL on no points.
    pub const NORCAL: (f64, f64, f64, f64) = (42.0, 37.0, -119.0, -124.5);

    /// SOCAL shifted west by half a degree (overlapping, distinct key).
    pub const SOCAL_SHIFTED: (f64, f64, f64, f64) = (35.0, 32.5, -114.5, -121.5);

    /// Whole world.
    pub const WORLD: (f64, f64, f64, f64) = (90.0, -90.0, 180.0, -180.0);
}
