//! Geographic coordinate primitives.
//!
//! Plain longitude/latitude points and axis-aligned bounding boxes, the
//! vocabulary shared by the waypoint store, the annotation geometry, and the
//! map host contract.

use serde::{Deserialize, Serialize};

/// A WGS84 point, longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Returns `[lng, lat]`, the order GeoJSON positions use.
    pub fn to_position(self) -> Vec<f64> {
        vec![self.lng, self.lat]
    }
}

impl From<(f64, f64)> for LngLat {
    fn from((lng, lat): (f64, f64)) -> Self {
        Self { lng, lat }
    }
}

/// Axis-aligned geographic bounding box.
///
/// No antimeridian handling: viewports that wrap are the host's problem to
/// split before handing bounds to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Returns true if the point lies inside or on the edge of this box.
    pub fn contains(&self, point: LngLat) -> bool {
        point.lng >= self.west
            && point.lng <= self.east
            && point.lat >= self.south
            && point.lat <= self.north
    }

    /// Returns true if `other` lies entirely within this box.
    pub fn contains_bbox(&self, other: &BBox) -> bool {
        self.contains(LngLat::new(other.west, other.south))
            && self.contains(LngLat::new(other.east, other.north))
    }

    /// Center of the box.
    pub fn center(&self) -> LngLat {
        LngLat::new((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }

    /// Smallest box covering all given points. `None` for an empty slice.
    pub fn of_points(points: &[LngLat]) -> Option<BBox> {
        let first = points.first()?;
        let mut bbox = BBox::new(first.lng, first.lat, first.lng, first.lat);
        for p in &points[1..] {
            bbox.west = bbox.west.min(p.lng);
            bbox.east = bbox.east.max(p.lng);
            bbox.south = bbox.south.min(p.lat);
            bbox.north = bbox.north.max(p.lat);
        }
        Some(bbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_point() {
        let bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(bbox.contains(LngLat::new(5.0, 5.0)));
        assert!(bbox.contains(LngLat::new(0.0, 10.0)));
        assert!(!bbox.contains(LngLat::new(-0.1, 5.0)));
        assert!(!bbox.contains(LngLat::new(5.0, 10.1)));
    }

    #[test]
    fn test_contains_bbox() {
        let outer = BBox::new(0.0, 0.0, 10.0, 10.0);
        let inner = BBox::new(2.0, 2.0, 8.0, 8.0);
        assert!(outer.contains_bbox(&inner));
        assert!(!inner.contains_bbox(&outer));
        // A box contains itself.
        assert!(outer.contains_bbox(&outer));
    }

    #[test]
    fn test_of_points() {
        assert_eq!(BBox::of_points(&[]), None);

        let bbox = BBox::of_points(&[
            LngLat::new(3.0, -1.0),
            LngLat::new(-2.0, 4.0),
            LngLat::new(1.0, 1.0),
        ])
        .unwrap();
        assert_eq!(bbox, BBox::new(-2.0, -1.0, 3.0, 4.0));
    }

    #[test]
    fn test_center() {
        let bbox = BBox::new(0.0, 0.0, 10.0, 20.0);
        assert_eq!(bbox.center(), LngLat::new(5.0, 10.0));
    }
}
