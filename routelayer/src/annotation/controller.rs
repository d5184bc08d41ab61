//! Main-side annotation orchestration.
//!
//! The controller drives the `Idle → ChunkBuilding → Placing → Idle` cycle:
//! a forced full rebuild on every accepted route result, and a debounced
//! incremental recheck on every viewport move-end. Two layers of caching
//! keep panning cheap:
//!
//! - bounds containment: when the viewport still fully contains the bbox of
//!   the last pass's anchors and every chunk was visible then, the pass is
//!   skipped outright;
//! - change detection: when the ordered hit-tested route-index list matches
//!   the previous pass (and containment holds), the existing anchors stay
//!   untouched, avoiding flicker.
//!
//! Hit-testing runs here, not in the engine, because it depends on render
//! state. Anchors that land off-route near clipped edges are filtered out.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::annotation::engine::AnnotationEngine;
use crate::annotation::geometry::AnchorSide;
use crate::geo::{BBox, LngLat};
use crate::map::{FeatureSource, MapHost};
use crate::provider::RouteProvider;
use crate::route::types::RouteResponse;

/// A placed annotation: one per distinct visible route segment chunk.
/// Derived and ephemeral; rebuilt wholesale on every recomputation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationAnchor {
    pub position: LngLat,
    pub anchor: AnchorSide,
    /// Route the anchor actually landed on per hit-test.
    pub route_index: u32,
    pub waypoint_index: u32,
}

/// Host-implemented annotation presentation. Widget/popup creation is the
/// host's job; the controller only says what to show where.
pub trait AnnotationView: Send + Sync {
    /// Tears down existing annotations and builds one per anchor.
    fn rebuild(&self, anchors: &[AnnotationAnchor]);

    /// Tears down all annotations.
    fn clear(&self);
}

/// What a placement pass did, observable for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Viewport still contains the previous pass entirely; nothing ran.
    SkippedBoundsCache,
    /// Pass ran but matched the previous route-index sequence; anchors kept.
    SkippedUnchanged,
    /// No anchor candidate in the viewport; a normal empty result.
    Empty,
    /// Anchors were torn down and rebuilt.
    Rebuilt(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    ChunkBuilding,
    Placing,
}

#[derive(Debug, Clone)]
pub struct AnnotationOptions {
    /// Rendered layer hit-tested to resolve which route an anchor landed on.
    pub route_layer_id: String,
    /// Quiet period collapsing a burst of move-end events into one pass.
    pub debounce: std::time::Duration,
}

impl Default for AnnotationOptions {
    fn default() -> Self {
        Self {
            route_layer_id: crate::control::DEFAULT_ROUTE_LAYER_ID.to_string(),
            debounce: std::time::Duration::from_millis(200),
        }
    }
}

struct ControllerState {
    phase: Phase,
    /// BBox of the last pass's anchor candidates.
    anchor_bounds: Option<BBox>,
    /// Whether every chunk was fully represented in the last pass.
    all_in_bbox: bool,
    /// Ordered hit-tested route indices of the last rebuild.
    current_route_indices: Vec<u32>,
}

pub struct AnnotationController {
    map: Arc<dyn MapHost>,
    engine: Arc<dyn AnnotationEngine>,
    view: Arc<dyn AnnotationView>,
    provider: Arc<dyn RouteProvider>,
    options: AnnotationOptions,
    state: tokio::sync::Mutex<ControllerState>,
}

impl AnnotationController {
    pub fn new(
        map: Arc<dyn MapHost>,
        engine: Arc<dyn AnnotationEngine>,
        view: Arc<dyn AnnotationView>,
        provider: Arc<dyn RouteProvider>,
        options: AnnotationOptions,
    ) -> Self {
        Self {
            map,
            engine,
            view,
            provider,
            options,
            state: tokio::sync::Mutex::new(ControllerState {
                phase: Phase::Idle,
                anchor_bounds: None,
                all_in_bbox: false,
                current_route_indices: Vec::new(),
            }),
        }
    }

    /// Full rebuild for a freshly accepted route result.
    ///
    /// Stale anchors from the previous route must never persist, so the view
    /// is cleared immediately. The chunk rebuild itself is deferred while
    /// the provider still has requests in flight; the next accepted result
    /// will land here again anyway.
    pub async fn handle_route_calculated(&self, data: Arc<RouteResponse>) {
        {
            let mut state = self.state.lock().await;
            state.all_in_bbox = false;
            state.current_route_indices.clear();
            state.anchor_bounds = None;
            state.phase = Phase::ChunkBuilding;
        }
        self.view.clear();

        if self.provider.has_pending_requests() {
            debug!("route fetches still pending; deferring chunk rebuild");
            self.state.lock().await.phase = Phase::Idle;
            return;
        }

        self.engine.create_chunks(data.geometry.clone()).await;
        self.run_pass(true).await;
    }

    /// One placement pass. `force` bypasses both caches (new route result);
    /// move-end passes leave it unset.
    pub async fn run_pass(&self, force: bool) -> PassOutcome {
        let viewport = self.map.viewport_bounds();
        let mut state = self.state.lock().await;

        let contained = state
            .anchor_bounds
            .is_some_and(|bounds| viewport.contains_bbox(&bounds));

        if !force && contained && state.all_in_bbox {
            trace!("placement skipped: viewport still covers previous pass");
            return PassOutcome::SkippedBoundsCache;
        }

        state.phase = Phase::Placing;
        let result = self.engine.recalculate_positions(viewport).await;

        if result.points.is_empty() {
            state.phase = Phase::Idle;
            return PassOutcome::Empty;
        }

        // Hit-test on the interactive side: which rendered route does each
        // anchor actually land on? Candidates near clipped edges can miss
        // the route entirely and are dropped.
        let layers = [self.options.route_layer_id.as_str()];
        let matched: Vec<(crate::annotation::geometry::AnchorCandidate, u32, u32)> = result
            .points
            .iter()
            .filter_map(|candidate| {
                self.map
                    .query_rendered_features(candidate.position, &layers)
                    .into_iter()
                    .find(|feature| {
                        feature.source == FeatureSource::Route && feature.route_index.is_some()
                    })
                    .map(|feature| {
                        (
                            *candidate,
                            feature.route_index.unwrap_or(0),
                            feature.waypoint_index.unwrap_or(0),
                        )
                    })
            })
            .collect();

        let matched_indices: Vec<u32> = matched.iter().map(|(_, route, _)| *route).collect();

        if !force && contained && matched_indices == state.current_route_indices {
            trace!("placement skipped: matched route sequence unchanged");
            state.phase = Phase::Idle;
            return PassOutcome::SkippedUnchanged;
        }

        self.view.clear();

        let anchor_positions: Vec<LngLat> =
            result.points.iter().map(|point| point.position).collect();
        state.anchor_bounds = BBox::of_points(&anchor_positions);
        state.all_in_bbox = result.all_in_bbox;
        state.current_route_indices = matched_indices;

        let anchors: Vec<AnnotationAnchor> = matched
            .iter()
            .map(|(candidate, route_index, waypoint_index)| AnnotationAnchor {
                position: candidate.position,
                anchor: candidate.anchor,
                route_index: *route_index,
                waypoint_index: *waypoint_index,
            })
            .collect();

        debug!(anchors = anchors.len(), "annotation anchors rebuilt");
        self.view.rebuild(&anchors);
        state.phase = Phase::Idle;
        PassOutcome::Rebuilt(anchors.len())
    }

    /// Clears all annotation state (plugin removal).
    pub async fn teardown(&self) {
        let mut state = self.state.lock().await;
        state.anchor_bounds = None;
        state.all_in_bbox = false;
        state.current_route_indices.clear();
        state.phase = Phase::Idle;
        self.view.clear();
    }
}
