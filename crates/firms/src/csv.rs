//! FIRMS CSV → FireEvent translation.
//!
//! FIRMS area CSV (MODIS and VIIRS share positions):
//!
//! ```text
//! latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,
//! instrument,confidence,version,bright_t31,frp,daynight
//! ```
//!
//! Columns are resolved from the header by name. Fields the header does not
//! name fall back to the pinned positions above. Rows with a
//! column count different from the header, or without numeric coordinates,
//! are skipped.

use fire_common::FireEvent;
use tracing::debug;

/// Column positions for the fields we extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub latitude: usize,
    pub longitude: usize,
    pub brightness: Option<usize>,
    pub acq_date: Option<usize>,
    pub acq_time: Option<usize>,
    pub satellite: Option<usize>,
    pub instrument: Option<usize>,
    pub confidence: Option<usize>,
    pub frp: Option<usize>,
    pub daynight: Option<usize>,
}

impl ColumnLayout {
    /// Pinned FIRMS area API column order (MODIS C6.1 / VIIRS 375m).
    pub const FIRMS_AREA: ColumnLayout = ColumnLayout {
        latitude: 0,
        longitude: 1,
        brightness: Some(2),
        acq_date: Some(5),
        acq_time: Some(6),
        satellite: Some(7),
        instrument: Some(8),
        confidence: Some(9),
        frp: Some(12),
        daynight: Some(13),
    };

    /// Number of columns in the pinned layout.
    pub const FIRMS_AREA_COLUMNS: usize = 14;

    /// Resolve positions from a header row.
    ///
    /// Named columns win. A field the header does not name falls back to its
    /// pinned position when the header has the pinned width.
    pub fn from_header(header: &[&str]) -> Self {
        let find = |names: &[&str]| {
            header
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let pinned = |idx: Option<usize>| {
            idx.filter(|_| header.len() == Self::FIRMS_AREA_COLUMNS)
        };
        let pinned_layout = Self::FIRMS_AREA;

        match (find(&["latitude", "lat"]), find(&["longitude", "lon", "lng"])) {
            (Some(latitude), Some(longitude)) => Self {
                latitude,
                longitude,
                brightness: find(&["brightness", "bright_ti4"])
                    .or_else(|| pinned(pinned_layout.brightness)),
                acq_date: find(&["acq_date"]).or_else(|| pinned(pinned_layout.acq_date)),
                acq_time: find(&["acq_time"]).or_else(|| pinned(pinned_layout.acq_time)),
                satellite: find(&["satellite"]).or_else(|| pinned(pinned_layout.satellite)),
                instrument: find(&["instrument"]).or_else(|| pinned(pinned_layout.instrument)),
                confidence: find(&["confidence"]).or_else(|| pinned(pinned_layout.confidence)),
                frp: find(&["frp"]).or_else(|| pinned(pinned_layout.frp)),
                daynight: find(&["daynight"]).or_else(|| pinned(pinned_layout.daynight)),
            },
            _ => Self::FIRMS_AREA,
        }
    }
}

/// Parse FIRMS CSV text into events, preserving source order.
pub fn parse_firms_csv(text: &str) -> Vec<FireEvent> {
    let mut lines = text
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty());

    let header: Vec<&str> = match lines.next() {
        Some(h) => h.split(',').collect(),
        None => return Vec::new(),
    };
    let layout = ColumnLayout::from_header(&header);
    let expected_columns = header.len();

    let mut events = Vec::new();
    let mut skipped = 0usize;

    for line in lines {
        let columns: Vec<&str> = line.split(',').map(str::trim).collect();
        if columns.len() != expected_columns {
            skipped += 1;
            continue;
        }
        match parse_row(&columns, &layout) {
            Some(event) => events.push(event),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(parsed = events.len(), skipped = skipped, "Skipped malformed FIRMS rows");
    }

    events
}

fn parse_row(columns: &[&str], layout: &ColumnLayout) -> Option<FireEvent> {
    let field = |idx: Option<usize>| idx.and_then(|i| columns.get(i)).copied().unwrap_or("");
    let text = |idx: Option<usize>| {
        let v = field(idx);
        (!v.is_empty()).then(|| v.to_string())
    };

    let latitude: f64 = columns.get(layout.latitude)?.parse().ok()?;
    let longitude: f64 = columns.get(layout.longitude)?.parse().ok()?;
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }

    Some(FireEvent {
        latitude,
        longitude,
        confidence: parse_confidence(field(layout.confidence)),
        frp: field(layout.frp).parse().unwrap_or(0.0),
        acq_date: field(layout.acq_date).to_string(),
        acq_time: normalize_acq_time(field(layout.acq_time)),
        brightness: field(layout.brightness).parse().ok(),
        satellite: text(layout.satellite),
        instrument: text(layout.instrument),
        daynight: text(layout.daynight),
    })
}

/// Numeric confidence is clamped to 0-100; VIIRS letter classes map to
/// 30/60/90; anything else is 0.
pub fn parse_confidence(raw: &str) -> i32 {
    if let Ok(value) = raw.parse::<f64>() {
        if value.is_finite() {
            return value.round().clamp(0.0, 100.0) as i32;
        }
        return 0;
    }
    match raw.to_ascii_lowercase().as_str() {
        "l" | "low" => 30,
        "n" | "nominal" => 60,
        "h" | "high" => 90,
        _ => 0,
    }
}

/// FIRMS drops leading zeros on early-morning times ("930" → "0930").
fn normalize_acq_time(raw: &str) -> String {
    if !raw.is_empty() && raw.len() < 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{:0>4}", raw)
    } else {
        raw.to_string()
    }
}

/// Sort descending by FRP; NaN sorts as zero.
pub fn sort_by_frp_desc(events: &mut [FireEvent]) {
    events.sort_by(|a, b| b.frp_or_zero().total_cmp(&a.frp_or_zero()));
}
