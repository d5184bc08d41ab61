//! Map/render host contract.
//!
//! The core consumes this trait; it never implements rendering. A host
//! binding (maplibre, a test double, ...) supplies named GeoJSON sources,
//! feature hit-testing against rendered layers, and viewport control.
//!
//! Input flows the other way by plain method calls: the host pushes move-end
//! events into [`crate::annotation::AnnotationPlugin::notify_move_end`]
//! and mouse events into [`crate::interaction::InteractionPlugin`], carrying
//! only map coordinates and the feature hits it resolved.

use geojson::FeatureCollection;

use crate::geo::{BBox, LngLat};

/// Which named source a rendered feature hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSource {
    Route,
    Waypoints,
}

/// One rendered feature under a queried point, with the properties the core
/// attaches to its sources echoed back.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub source: FeatureSource,
    /// `routeIndex` property of a route segment.
    pub route_index: Option<u32>,
    /// `waypointIndex` property of a route segment.
    pub waypoint_index: Option<u32>,
    /// `selected` property of a route segment.
    pub selected: bool,
    /// `id` property of a waypoint feature.
    pub waypoint_id: Option<u32>,
}

/// Rendering and viewport services the core requires from its host.
pub trait MapHost: Send + Sync {
    /// Creates or replaces the data of a named GeoJSON source.
    fn set_geojson_source(&self, source_id: &str, data: FeatureCollection);

    /// Removes a named source (control detach).
    fn remove_source(&self, source_id: &str);

    /// Returns the rendered features under the given map position,
    /// restricted to the named layers, topmost first.
    ///
    /// The position is a map coordinate; the host performs its own
    /// projection to screen space before querying.
    fn query_rendered_features(&self, position: LngLat, layers: &[&str]) -> Vec<RenderedFeature>;

    /// Current viewport bounding box.
    fn viewport_bounds(&self) -> BBox;

    /// Fits the viewport to `bounds` with the given padding in pixels.
    fn fit_bounds(&self, bounds: BBox, padding: f64);
}
