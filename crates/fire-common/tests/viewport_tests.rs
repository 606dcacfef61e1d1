//! Tests for Viewport parsing, keys and containment.

use fire_common::viewport::{Viewport, ViewportParseError};
use fire_common::Location;

// ============================================================================
// Constructor tests
// ============================================================================

#[test]
fn test_viewport_new() {
    let vp = Viewport::new(50.0, 24.0, -66.0, -125.0);
    assert_eq!(vp.north, 50.0);
    assert_eq!(vp.south, 24.0);
    assert_eq!(vp.east, -66.0);
    assert_eq!(vp.west, -125.0);
}

#[test]
fn test_usa_shortcut() {
    assert_eq!(Viewport::usa().to_area_string(), "-125,24,-66,50");
}

#[test]
fn test_try_new_rejects_nan() {
    let result = Viewport::try_new(f64::NAN, 0.0, 10.0, -10.0);
    assert!(matches!(result, Err(ViewportParseError::InvalidNumber(_))));
}

#[test]
fn test_try_new_rejects_inverted() {
    let result = Viewport::try_new(10.0, 20.0, 10.0, -10.0);
    assert!(matches!(result, Err(ViewportParseError::Inverted { .. })));
}

// ============================================================================
// Area string tests
// ============================================================================

#[test]
fn test_parse_area_with_spaces() {
    let vp = Viewport::from_area_string(" -120.5, 33.0 , -117.0,35.25").unwrap();
    assert!((vp.west - (-120.5)).abs() < 1e-9);
    assert!((vp.north - 35.25).abs() < 1e-9);
}

#[test]
fn test_parse_area_wrong_count() {
    let result = Viewport::from_area_string("1,2,3");
    assert!(matches!(result, Err(ViewportParseError::InvalidFormat(_))));
}

#[test]
fn test_parse_area_not_a_number() {
    let result = Viewport::from_area_string("a,2,3,4");
    assert!(matches!(result, Err(ViewportParseError::InvalidNumber(_))));
}

#[test]
fn test_area_string_roundtrip() {
    let vp = Viewport::new(35.0, 33.0, -117.0, -120.0);
    let parsed = Viewport::from_area_string(&vp.to_area_string()).unwrap();
    assert_eq!(vp, parsed);
}

// ============================================================================
// Cache key tests
// ============================================================================

#[test]
fn test_identical_viewports_share_key() {
    let a = Viewport::new(35.0, 33.0, -117.0, -120.0);
    let b = Viewport::new(35.0, 33.0, -117.0, -120.0);
    assert_eq!(a.cache_key(), b.cache_key());
}

#[test]
fn test_overlapping_viewports_have_distinct_keys() {
    let a = Viewport::new(35.0, 33.0, -117.0, -120.0);
    let b = Viewport::new(35.0, 33.0, -117.0, -120.5);
    assert_ne!(a.cache_key(), b.cache_key());
}

// ============================================================================
// Containment tests
// ============================================================================

#[test]
fn test_contains_is_inclusive() {
    let vp = Viewport::new(10.0, 0.0, 10.0, 0.0);
    assert!(vp.contains(0.0, 0.0));
    assert!(vp.contains(10.0, 10.0));
    assert!(vp.contains(5.0, 5.0));
    assert!(!vp.contains(10.0001, 5.0));
    assert!(!vp.contains(5.0, -0.0001));
}

#[test]
fn test_contains_across_antimeridian() {
    // Pacific view from 170E to 170W.
    let vp = Viewport::try_new(10.0, -10.0, -170.0, 170.0).unwrap();
    assert!(vp.crosses_antimeridian());
    assert!(vp.contains(0.0, 175.0));
    assert!(vp.contains(0.0, -175.0));
    assert!(vp.contains(0.0, 180.0));
    assert!(!vp.contains(0.0, 0.0));
    assert!(!vp.contains(20.0, 175.0));
}

#[test]
fn test_clamped_to_web_mercator() {
    let vp = Viewport::new(90.0, -90.0, 200.0, -200.0).clamped();
    assert!(vp.north < 85.06);
    assert!(vp.south > -85.06);
    assert_eq!(vp.east, 180.0);
    assert_eq!(vp.west, -180.0);
}

// ============================================================================
// Location tests
// ============================================================================

#[test]
fn test_location_validation() {
    assert!(Location::new("Home", 34.0, -118.0).is_valid());
    assert!(!Location::new("  ", 34.0, -118.0).is_valid());
    assert!(!Location::new("Bad", 95.0, -118.0).is_valid());
    assert!(!Location::new("Bad", 34.0, f64::INFINITY).is_valid());
}

#[test]
fn test_location_ids_are_unique() {
    let a = Location::new("A", 0.0, 0.0);
    let b = Location::new("B", 0.0, 0.0);
    assert_ne!(a.id, b.id);
}
