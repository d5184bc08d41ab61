//! Gesture-driven waypoint editing.
//!
//! The host recognizes gestures and reports only map coordinates; this
//! plugin resolves feature hits through the map host and mutates the
//! waypoint store accordingly:
//!
//! - click on an unselected rendered route selects it;
//! - click on empty map appends a waypoint while fewer than 2 exist;
//! - mouse-down on a waypoint starts dragging it; on a selected route
//!   segment, a new waypoint is inserted after that segment's leg and
//!   dragged;
//! - mouse-move during a drag updates the dragged waypoint; coordinate-equal
//!   moves are store-level no-ops and trigger nothing downstream.
//!
//! Drag transitions fire the `dirty` event. Recalculation requests go
//! through a leading+trailing throttle so a drag burst costs the bounded
//! pool only its first and last request, and a rejected recalculation is
//! observed and ignored: the next user action retriggers one anyway.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::control::{RoutingContext, DEFAULT_ROUTE_LAYER_ID, DEFAULT_WAYPOINTS_LAYER_ID};
use crate::coordinator::{RecalculateOptions, RequestCoordinator};
use crate::event::{Dispatcher, RoutingEvent};
use crate::geo::LngLat;
use crate::map::{FeatureSource, MapHost};
use crate::plugin::Plugin;
use crate::route::sync::RenderSync;
use crate::throttle::Throttle;
use crate::waypoints::WaypointStore;

/// What a mouse-down did, so the host knows whether to suspend map panning
/// for the duration of the drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureResponse {
    /// Nothing of ours was hit; the host keeps its default behavior.
    Ignored,
    /// A drag began; the host should disable map panning until mouse-up.
    DragStarted,
}

#[derive(Debug, Clone)]
pub struct InteractionOptions {
    /// Recalculate while a drag is still in progress.
    pub calculate_on_fly: bool,
    pub route_layer_id: String,
    pub waypoints_layer_id: String,
    /// Throttle window for drag-driven recalculation.
    pub recalculate_throttle: Duration,
}

impl Default for InteractionOptions {
    fn default() -> Self {
        Self {
            calculate_on_fly: true,
            route_layer_id: DEFAULT_ROUTE_LAYER_ID.to_string(),
            waypoints_layer_id: DEFAULT_WAYPOINTS_LAYER_ID.to_string(),
            recalculate_throttle: Duration::from_millis(100),
        }
    }
}

struct InteractionState {
    options: InteractionOptions,
    store: Arc<WaypointStore>,
    sync: Arc<RenderSync>,
    map: Arc<dyn MapHost>,
    dispatcher: Arc<Dispatcher>,
    drag_origin: Mutex<Option<usize>>,
    dragging: AtomicBool,
    recalculate: Throttle,
}

impl InteractionState {
    fn new(ctx: &Arc<RoutingContext>, options: InteractionOptions) -> Self {
        let coordinator: Arc<RequestCoordinator> = Arc::clone(&ctx.coordinator);
        let runtime = tokio::runtime::Handle::current();
        let recalculate = Throttle::new(options.recalculate_throttle, move || {
            let coordinator = Arc::clone(&coordinator);
            runtime.spawn(async move {
                // Observe-and-ignore: the next user action naturally
                // retriggers a request.
                if let Err(error) = coordinator.recalculate(RecalculateOptions::default()).await {
                    debug!(%error, "drag-driven recalculation rejected");
                }
            });
        });

        Self {
            options,
            store: Arc::clone(&ctx.store),
            sync: Arc::clone(&ctx.sync),
            map: Arc::clone(&ctx.map),
            dispatcher: Arc::clone(&ctx.dispatcher),
            drag_origin: Mutex::new(None),
            dragging: AtomicBool::new(false),
            recalculate,
        }
    }

    fn on_click(&self, position: LngLat) {
        let hits = self
            .map
            .query_rendered_features(position, &[self.options.route_layer_id.as_str()]);

        if let Some(route) = hits.iter().find(|hit| hit.source == FeatureSource::Route) {
            if !route.selected {
                if let Some(route_index) = route.route_index {
                    self.sync.select_route(route_index);
                }
                return;
            }
        }

        if self.store.len() >= 2 {
            return;
        }

        self.store.insert(position, self.store.len(), None);
        self.maybe_recalculate();
    }

    fn on_mouse_down(&self, position: LngLat) -> GestureResponse {
        let layers = [
            self.options.route_layer_id.as_str(),
            self.options.waypoints_layer_id.as_str(),
        ];
        let hits = self.map.query_rendered_features(position, &layers);
        if hits.is_empty() {
            return GestureResponse::Ignored;
        }

        if let Some(waypoint) = hits.iter().find(|hit| hit.source == FeatureSource::Waypoints) {
            if let Some(id) = waypoint.waypoint_id {
                self.begin_drag(id as usize);
                return GestureResponse::DragStarted;
            }
        }

        let selected_route = hits
            .iter()
            .find(|hit| hit.source == FeatureSource::Route && hit.selected);
        if let Some(route) = selected_route {
            // Grab the selected route itself: insert a fresh waypoint after
            // the leg under the cursor and drag that.
            let insert_at = route.waypoint_index.unwrap_or(0) as usize + 1;
            self.store.insert(position, insert_at, None);
            self.begin_drag(insert_at);
            self.maybe_recalculate();
            return GestureResponse::DragStarted;
        }

        GestureResponse::Ignored
    }

    /// Returns true when the move was consumed by an active drag.
    fn on_mouse_move(&self, position: LngLat) -> bool {
        let origin = *self.drag_origin.lock().expect("drag state poisoned");
        let Some(index) = origin else {
            return false;
        };

        if self.store.update(position, index, None) {
            self.maybe_recalculate();
        }
        true
    }

    /// Returns true when a drag was in progress.
    fn on_mouse_up(&self) -> bool {
        let origin = self
            .drag_origin
            .lock()
            .expect("drag state poisoned")
            .take();
        if origin.is_none() {
            return false;
        }

        self.dragging.store(false, Ordering::SeqCst);
        self.dispatcher.fire(RoutingEvent::Dirty(false));
        // Make sure the final drag position gets a request even when
        // on-the-fly recalculation is disabled.
        self.recalculate.call();
        true
    }

    fn begin_drag(&self, index: usize) {
        *self.drag_origin.lock().expect("drag state poisoned") = Some(index);
        self.dragging.store(true, Ordering::SeqCst);
        self.dispatcher.fire(RoutingEvent::Dirty(true));
    }

    fn maybe_recalculate(&self) {
        if !self.dragging.load(Ordering::SeqCst) || self.options.calculate_on_fly {
            self.recalculate.call();
        }
    }
}

/// Control plugin exposing the gesture entry points to the host.
#[derive(Default)]
pub struct InteractionPlugin {
    options: InteractionOptions,
    state: Option<Arc<InteractionState>>,
}

impl InteractionPlugin {
    pub fn new(options: InteractionOptions) -> Self {
        Self {
            options,
            state: None,
        }
    }

    pub fn on_click(&self, position: LngLat) {
        if let Some(state) = &self.state {
            state.on_click(position);
        }
    }

    pub fn on_mouse_down(&self, position: LngLat) -> GestureResponse {
        match &self.state {
            Some(state) => state.on_mouse_down(position),
            None => GestureResponse::Ignored,
        }
    }

    pub fn on_mouse_move(&self, position: LngLat) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| state.on_mouse_move(position))
    }

    pub fn on_mouse_up(&self) -> bool {
        self.state.as_ref().is_some_and(|state| state.on_mouse_up())
    }

    /// True while a waypoint drag is in progress.
    pub fn dirty(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| state.dragging.load(Ordering::SeqCst))
    }
}

impl Plugin for InteractionPlugin {
    fn on_add(&mut self, ctx: &Arc<RoutingContext>) {
        self.state = Some(Arc::new(InteractionState::new(ctx, self.options.clone())));
    }

    fn on_remove(&mut self, _ctx: &Arc<RoutingContext>) {
        self.state = None;
    }
}
