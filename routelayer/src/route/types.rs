//! Route data model.
//!
//! A [`RouteResponse`] is replaced wholesale on every accepted request; no
//! merging ever happens. Candidate routes inside one response are mutually
//! exclusive alternatives identified by their position in the provider's
//! result list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{BBox, LngLat};

/// An ordered stop the route must pass through or near.
///
/// `original_pos` is where the user placed the waypoint; `mapped_pos` is the
/// provider's road-snapped position when one is known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub original_pos: LngLat,
    pub mapped_pos: Option<LngLat>,
}

impl Waypoint {
    pub fn new(original_pos: LngLat) -> Self {
        Self {
            original_pos,
            mapped_pos: None,
        }
    }

    pub fn with_mapped(original_pos: LngLat, mapped_pos: Option<LngLat>) -> Self {
        Self {
            original_pos,
            mapped_pos,
        }
    }
}

/// Summary of one candidate route.
///
/// `id` is the candidate's position in the provider's result list and is
/// stable within a single response only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub id: u32,
    /// Travel time in seconds.
    pub total_time: f64,
    /// Length in meters.
    pub distance: f64,
    /// Monetary cost (tolls), when the provider reports one.
    pub cost: Option<f64>,
    pub arrive_time: DateTime<Utc>,
    pub departure_time: DateTime<Utc>,
}

/// Per-response summary block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSummary {
    pub routes: Vec<RouteSummary>,
    /// Candidate the provider pre-selected by its configured strategy.
    pub selected_route_id: Option<u32>,
}

/// One contiguous piece of a candidate route's geometry between two
/// waypoints (or a provider-defined sub-division).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentFeature {
    pub coordinates: Vec<LngLat>,
    /// Which candidate route this segment belongs to.
    pub route_index: u32,
    /// Which leg (between consecutive waypoints) this segment covers.
    pub waypoint_index: u32,
    pub selected: bool,
}

/// Complete result of one routing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    /// Provider payload, passed through untouched for host consumption.
    pub raw_data: serde_json::Value,
    pub geometry: Vec<SegmentFeature>,
    pub bounds: Option<BBox>,
    pub summary: ResponseSummary,
}
