//! Test data generators for fire events and viewports.
//!
//! These generators create predictable, verifiable data so that dedupe and
//! filtering assertions can be computed by hand.

use fire_common::{FireEvent, Viewport};

/// Creates a single event with fixed date/time and the given position.
pub fn make_event(lat: f64, lon: f64, frp: f64) -> FireEvent {
    FireEvent::new(lat, lon, 75, frp, "2024-01-01", "1200")
}

/// Creates `count` distinct events spread along a line starting at
/// (`lat`, `lon`), each 0.01 degrees apart, with FRP equal to the index.
///
/// # Example
///
/// ```
/// use test_utils::make_events;
///
/// let events = make_events(34.0, -118.0, 3);
/// assert_eq!(events.len(), 3);
/// assert_eq!(events[2].frp, 2.0);
/// ```
pub fn make_events(lat: f64, lon: f64, count: usize) -> Vec<FireEvent> {
    (0..count)
        .map(|i| {
            let offset = i as f64 * 0.01;
            make_event(lat + offset, lon + offset, i as f64)
        })
        .collect()
}

/// Builds a FIRMS CSV body (MODIS header) for the given events.
pub fn events_to_firms_csv(events: &[FireEvent]) -> String {
    let mut out = String::from(crate::fixtures::csv::MODIS_HEADER);
    out.push('\n');
    for e in events {
        out.push_str(&format!(
            "{},{},{},1.0,1.0,{},{},Terra,MODIS,{},6.1NRT,290.0,{},D\n",
            e.latitude,
            e.longitude,
            e.brightness.unwrap_or(320.0),
            e.acq_date,
            e.acq_time,
            e.confidence,
            e.frp
        ));
    }
    out
}

/// Converts a (north, south, east, west) fixture tuple into a Viewport.
pub fn viewport_from(t: (f64, f64, f64, f64)) -> Viewport {
    Viewport::new(t.0, t.1, t.2, t.3)
}
