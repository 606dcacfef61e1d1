//! Fixed fallback dataset served when FIRMS cannot be reached.

use fire_common::FireEvent;

/// A handful of representative California detections.
pub fn sample_events() -> Vec<FireEvent> {
    vec![
        sample(34.0522, -118.2437, 85, 45.2, "1200"),
        sample(37.7749, -122.4194, 72, 23.8, "1315"),
        sample(36.7783, -119.4179, 91, 67.5, "1030"),
        sample(38.5816, -121.4944, 64, 12.1, "0945"),
        sample(40.5865, -122.3917, 88, 54.9, "2110"),
        sample(33.6846, -117.8265, 58, 8.4, "2245"),
    ]
}

fn sample(lat: f64, lon: f64, confidence: i32, frp: f64, time: &str) -> FireEvent {
    let mut event = FireEvent::new(lat, lon, confidence, frp, "2024-01-01", time);
    event.instrument = Some("SAMPLE".to_string());
    event
}
