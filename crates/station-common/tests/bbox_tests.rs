//! Tests for BoundingBox construction from map corners.

use station_common::bbox::{BboxParseError, BoundingBox};

// ============================================================================
// Constructor tests
// ============================================================================

#[test]
fn test_bbox_new() {
    let bbox = BoundingBox::new(-180.0, 180.0, -90.0, 90.0);
    assert_eq!(bbox.min_lon, -180.0);
    assert_eq!(bbox.max_lon, 180.0);
    assert_eq!(bbox.min_lat, -90.0);
    assert_eq!(bbox.max_lat, 90.0);
}

#[test]
fn test_bbox_copy() {
    let bbox1 = BoundingBox::new(0.0, 10.0, 0.0, 10.0);
    let bbox2 = bbox1;
    assert_eq!(bbox1, bbox2);
}

// ============================================================================
// from_corners tests
// ============================================================================

#[test]
fn test_corners_rotated_quadrilateral() {
    // A pitched/rotated view: no two corners share an axis value.
    let corners = [[-104.2, 44.1], [-88.7, 47.3], [-86.1, 35.9], [-101.6, 32.4]];
    let bbox = BoundingBox::from_corners(&corners).unwrap();
    assert_eq!(bbox, BoundingBox::new(-104.2, -86.1, 32.4, 47.3));
}

#[test]
fn test_corners_order_does_not_matter() {
    let a = [[-10.0, 5.0], [10.0, 5.0], [10.0, -5.0], [-10.0, -5.0]];
    let mut b = a;
    b.reverse();
    assert_eq!(
        BoundingBox::from_corners(&a).unwrap(),
        BoundingBox::from_corners(&b).unwrap()
    );
}

#[test]
fn test_corners_single_point() {
    let bbox = BoundingBox::from_corners(&[[3.0, 4.0]]).unwrap();
    assert_eq!(bbox.width(), 0.0);
    assert_eq!(bbox.height(), 0.0);
    assert!(bbox.contains_point(3.0, 4.0));
}

#[test]
fn test_corners_empty() {
    let result = BoundingBox::from_corners(&[]);
    assert!(matches!(result, Err(BboxParseError::NoCorners)));
}

#[test]
fn test_corners_non_finite() {
    let result = BoundingBox::from_corners(&[[0.0, 0.0], [f64::NAN, 1.0]]);
    assert!(matches!(result, Err(BboxParseError::NonFiniteCorner(1))));
}

// ============================================================================
// Dimension and containment tests
// ============================================================================

#[test]
fn test_bbox_width_crossing_zero() {
    let bbox = BoundingBox::new(-10.0, 10.0, 0.0, 10.0);
    assert_eq!(bbox.width(), 20.0);
}

#[test]
fn test_bbox_height() {
    let bbox = BoundingBox::new(0.0, 10.0, 5.0, 25.0);
    assert_eq!(bbox.height(), 20.0);
}

#[test]
fn test_contains_point_inside_and_outside() {
    let conus = BoundingBox::new(-130.0, -60.0, 20.0, 55.0);
    assert!(conus.contains_point(-94.67, 39.1));
    assert!(!conus.contains_point(2.35, 48.85));
    assert!(!conus.contains_point(-94.67, 60.0));
}
