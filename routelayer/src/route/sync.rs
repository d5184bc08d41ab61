//! Route and waypoint render synchronization.
//!
//! Projects waypoint-store and route-response state into two named GeoJSON
//! map sources: "route" (segment line features) and "waypoints" (one point
//! per waypoint). This is geometry shaping and diffing only; rendering stays
//! with the host.
//!
//! Selection is a pure re-tagging operation over the last response: no
//! re-fetch happens when the user picks a different candidate.

use std::sync::{Arc, Mutex};

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use tracing::debug;

use crate::event::{Dispatcher, RoutingEvent};
use crate::map::MapHost;
use crate::route::types::{RouteResponse, SegmentFeature, Waypoint};

/// Property names attached to published features. Host layer styles and
/// hit-test echoes key off these.
pub const PROP_ROUTE_INDEX: &str = "routeIndex";
pub const PROP_WAYPOINT_INDEX: &str = "waypointIndex";
pub const PROP_SELECTED: &str = "selected";
pub const PROP_WAYPOINT_ID: &str = "id";

pub struct RenderSync {
    map: Arc<dyn MapHost>,
    dispatcher: Arc<Dispatcher>,
    route_source_id: String,
    waypoints_source_id: String,
    state: Mutex<SyncState>,
}

#[derive(Default)]
struct SyncState {
    response: Option<Arc<RouteResponse>>,
    selected_route_id: Option<u32>,
    alternatives_hidden: bool,
}

impl RenderSync {
    pub fn new(
        map: Arc<dyn MapHost>,
        dispatcher: Arc<Dispatcher>,
        route_source_id: impl Into<String>,
        waypoints_source_id: impl Into<String>,
    ) -> Self {
        Self {
            map,
            dispatcher,
            route_source_id: route_source_id.into(),
            waypoints_source_id: waypoints_source_id.into(),
            state: Mutex::new(SyncState::default()),
        }
    }

    /// Creates both sources with empty data.
    pub fn setup_sources(&self) {
        self.map
            .set_geojson_source(&self.route_source_id, empty_collection());
        self.map
            .set_geojson_source(&self.waypoints_source_id, empty_collection());
    }

    /// Removes both sources.
    pub fn teardown_sources(&self) {
        self.map.remove_source(&self.route_source_id);
        self.map.remove_source(&self.waypoints_source_id);
    }

    /// Replaces the route payload wholesale from a freshly accepted
    /// response.
    pub fn set_route_data(&self, response: Arc<RouteResponse>) {
        let features = {
            let mut state = self.state.lock().expect("render sync poisoned");
            state.selected_route_id = response.summary.selected_route_id;
            state.alternatives_hidden = false;
            state.response = Some(Arc::clone(&response));
            visible_features(&state)
        };
        self.publish_route(features);
    }

    /// Re-tags every segment's `selected` flag against `route_id` over the
    /// last response and fires `routeSelected`. Returns false when no
    /// response has been published yet.
    pub fn select_route(&self, route_id: u32) -> bool {
        let (retagged, features) = {
            let mut state = self.state.lock().expect("render sync poisoned");
            let Some(response) = state.response.as_ref() else {
                return false;
            };

            let geometry: Vec<SegmentFeature> = response
                .geometry
                .iter()
                .map(|segment| SegmentFeature {
                    selected: segment.route_index == route_id,
                    ..segment.clone()
                })
                .collect();

            let mut updated = RouteResponse::clone(response);
            updated.geometry = geometry;
            updated.summary.selected_route_id = Some(route_id);
            let updated = Arc::new(updated);

            state.response = Some(Arc::clone(&updated));
            state.selected_route_id = Some(route_id);
            (updated, visible_features(&state))
        };

        debug!(route_id, "route selection re-tagged");
        self.publish_route(features);
        self.dispatcher.fire(RoutingEvent::RouteSelected {
            data: retagged,
            route_id,
        });
        true
    }

    /// Publishes only the selected segments.
    pub fn hide_alternative_routes(&self) {
        let features = {
            let mut state = self.state.lock().expect("render sync poisoned");
            state.alternatives_hidden = true;
            visible_features(&state)
        };
        self.publish_route(features);
    }

    /// Restores the full segment set.
    pub fn show_all_routes(&self) {
        let features = {
            let mut state = self.state.lock().expect("render sync poisoned");
            state.alternatives_hidden = false;
            visible_features(&state)
        };
        self.publish_route(features);
    }

    /// Rebuilds the waypoints payload: one point feature per waypoint, in
    /// list order, carrying its index.
    pub fn update_waypoints(&self, waypoints: &[Waypoint]) {
        self.map.set_geojson_source(
            &self.waypoints_source_id,
            waypoints_to_feature_collection(waypoints),
        );
    }

    pub fn selected_route_id(&self) -> Option<u32> {
        self.state
            .lock()
            .expect("render sync poisoned")
            .selected_route_id
    }

    /// Last published response, if any.
    pub fn response(&self) -> Option<Arc<RouteResponse>> {
        self.state.lock().expect("render sync poisoned").response.clone()
    }

    fn publish_route(&self, features: Vec<SegmentFeature>) {
        self.map.set_geojson_source(
            &self.route_source_id,
            segments_to_feature_collection(&features),
        );
    }
}

fn visible_features(state: &SyncState) -> Vec<SegmentFeature> {
    let Some(response) = state.response.as_ref() else {
        return Vec::new();
    };
    if state.alternatives_hidden {
        response
            .geometry
            .iter()
            .filter(|segment| segment.selected)
            .cloned()
            .collect()
    } else {
        response.geometry.clone()
    }
}

fn empty_collection() -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    }
}

/// Shapes route segments into a GeoJSON feature collection.
pub fn segments_to_feature_collection(segments: &[SegmentFeature]) -> FeatureCollection {
    let features = segments
        .iter()
        .map(|segment| {
            let positions = segment
                .coordinates
                .iter()
                .map(|c| c.to_position())
                .collect();

            let mut properties = JsonObject::new();
            properties.insert(PROP_ROUTE_INDEX.into(), segment.route_index.into());
            properties.insert(PROP_WAYPOINT_INDEX.into(), segment.waypoint_index.into());
            properties.insert(PROP_SELECTED.into(), segment.selected.into());

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::LineString(positions))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Shapes waypoints into a GeoJSON feature collection of points.
pub fn waypoints_to_feature_collection(waypoints: &[Waypoint]) -> FeatureCollection {
    let features = waypoints
        .iter()
        .enumerate()
        .map(|(id, waypoint)| {
            let mut properties = JsonObject::new();
            properties.insert(PROP_WAYPOINT_ID.into(), (id as u32).into());

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(
                    waypoint.original_pos.to_position(),
                ))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
