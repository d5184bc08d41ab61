//! Top-level routing control facade.
//!
//! [`RoutingControl`] wires the store, coordinator, render sync, and plugins
//! together and is the host's single entry point. The shape mirrors a map
//! control: construct with options, `attach` to a map host, interact, and
//! `detach` to release everything.
//!
//! Waypoint operations work while detached (they only touch the store);
//! recalculation while detached is a quiet no-op, matching the behavior of
//! a control that has not been added to a map yet.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::coordinator::{CoordinatorConfig, RecalculateOptions, RequestCoordinator};
use crate::error::RoutingError;
use crate::event::{Dispatcher, EventKind, HandlerId, RoutingEvent};
use crate::geo::LngLat;
use crate::map::MapHost;
use crate::plugin::{Plugin, PluginSpec};
use crate::provider::RouteProvider;
use crate::route::select::SelectRouteStrategy;
use crate::route::sync::RenderSync;
use crate::route::types::{RouteResponse, Waypoint};
use crate::waypoints::WaypointStore;

pub const DEFAULT_ROUTE_SOURCE_ID: &str = "routelayer-route-source";
pub const DEFAULT_WAYPOINTS_SOURCE_ID: &str = "routelayer-waypoints-source";
pub const DEFAULT_ROUTE_LAYER_ID: &str = "routelayer-route";
pub const DEFAULT_WAYPOINTS_LAYER_ID: &str = "routelayer-waypoints";

/// Control configuration.
pub struct RoutingOptions {
    pub provider: Option<Arc<dyn RouteProvider>>,
    /// Alternative routes requested for simple A→B trips.
    pub alternatives: u32,
    pub skip_alternatives_on_multiple_waypoints: bool,
    pub first_route_center: bool,
    pub strategy: SelectRouteStrategy,
    pub route_source_id: String,
    pub waypoints_source_id: String,
}

impl Default for RoutingOptions {
    fn default() -> Self {
        Self {
            provider: None,
            alternatives: 1,
            skip_alternatives_on_multiple_waypoints: true,
            first_route_center: true,
            strategy: SelectRouteStrategy::Fastest,
            route_source_id: DEFAULT_ROUTE_SOURCE_ID.to_string(),
            waypoints_source_id: DEFAULT_WAYPOINTS_SOURCE_ID.to_string(),
        }
    }
}

/// Everything a plugin may need from the attached control.
pub struct RoutingContext {
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<WaypointStore>,
    pub map: Arc<dyn MapHost>,
    pub provider: Option<Arc<dyn RouteProvider>>,
    pub sync: Arc<RenderSync>,
    pub coordinator: Arc<RequestCoordinator>,
    pub route_source_id: String,
    pub waypoints_source_id: String,
}

pub struct RoutingControl {
    dispatcher: Arc<Dispatcher>,
    store: Arc<WaypointStore>,
    options: RoutingOptions,
    pending_plugins: Vec<PluginSpec>,
    plugins: Vec<Box<dyn Plugin>>,
    ctx: Option<Arc<RoutingContext>>,
    waypoints_subscription: Option<HandlerId>,
}

impl RoutingControl {
    pub fn new(options: RoutingOptions) -> Self {
        let dispatcher = Arc::new(Dispatcher::new());
        let store = Arc::new(WaypointStore::new(Arc::clone(&dispatcher)));
        Self {
            dispatcher,
            store,
            options,
            pending_plugins: Vec::new(),
            plugins: Vec::new(),
            ctx: None,
            waypoints_subscription: None,
        }
    }

    /// Registers a plugin to be resolved at attach time.
    pub fn with_plugin(mut self, spec: PluginSpec) -> Self {
        self.pending_plugins.push(spec);
        self
    }

    /// Attaches the control to a map host: creates the empty sources, builds
    /// the request pipeline, and adds all plugins. Must run inside a tokio
    /// runtime context.
    pub fn attach(&mut self, map: Arc<dyn MapHost>) {
        if self.ctx.is_some() {
            warn!("attach called while already attached; ignoring");
            return;
        }

        let sync = Arc::new(RenderSync::new(
            Arc::clone(&map),
            Arc::clone(&self.dispatcher),
            self.options.route_source_id.clone(),
            self.options.waypoints_source_id.clone(),
        ));
        sync.setup_sources();

        // Downstream waypoint consumers resync to the full list on every
        // store change.
        let sync_for_events = Arc::clone(&sync);
        self.waypoints_subscription = Some(self.dispatcher.on(EventKind::Waypoints, move |event| {
            if let RoutingEvent::Waypoints(list) = event {
                sync_for_events.update_waypoints(list);
            }
        }));

        let coordinator = Arc::new(RequestCoordinator::new(
            Arc::clone(&self.store),
            self.options.provider.clone(),
            Arc::clone(&sync),
            Arc::clone(&map),
            Arc::clone(&self.dispatcher),
            CoordinatorConfig {
                alternatives: self.options.alternatives,
                skip_alternatives_on_multiple_waypoints: self
                    .options
                    .skip_alternatives_on_multiple_waypoints,
                first_route_center: self.options.first_route_center,
                strategy: self.options.strategy,
            },
        ));

        let ctx = Arc::new(RoutingContext {
            dispatcher: Arc::clone(&self.dispatcher),
            store: Arc::clone(&self.store),
            map,
            provider: self.options.provider.clone(),
            sync,
            coordinator,
            route_source_id: self.options.route_source_id.clone(),
            waypoints_source_id: self.options.waypoints_source_id.clone(),
        });

        let mut plugins: Vec<Box<dyn Plugin>> =
            self.pending_plugins.drain(..).map(PluginSpec::resolve).collect();
        plugins.append(&mut self.plugins);
        for plugin in &mut plugins {
            plugin.on_add(&ctx);
        }
        self.plugins = plugins;
        self.ctx = Some(ctx);
        debug!("routing control attached");
    }

    /// Detaches from the map host: removes plugins, destroys the provider,
    /// and removes both sources.
    pub fn detach(&mut self) {
        let Some(ctx) = self.ctx.take() else {
            return;
        };

        for plugin in &mut self.plugins {
            plugin.on_remove(&ctx);
        }
        if let Some(id) = self.waypoints_subscription.take() {
            self.dispatcher.off(EventKind::Waypoints, id);
        }
        if let Some(provider) = &ctx.provider {
            provider.destroy();
        }
        ctx.sync.teardown_sources();
        debug!("routing control detached");
    }

    pub fn is_attached(&self) -> bool {
        self.ctx.is_some()
    }

    /// Context handle for hosts that drive plugins directly.
    pub fn context(&self) -> Option<Arc<RoutingContext>> {
        self.ctx.clone()
    }

    // === Waypoint operations (store delegates) ===

    pub fn set_waypoints(&self, points: Vec<Waypoint>) {
        self.store.set_all(points);
    }

    pub fn add_waypoint(&self, point: LngLat, index: usize, mapped_pos: Option<LngLat>) {
        self.store.insert(point, index, mapped_pos);
    }

    pub fn update_waypoint(&self, point: LngLat, index: usize, mapped_pos: Option<LngLat>) -> bool {
        self.store.update(point, index, mapped_pos)
    }

    pub fn remove_waypoint(&self, index: usize) {
        self.store.remove(index);
    }

    pub fn get_waypoint(&self, index: usize) -> Option<Waypoint> {
        self.store.get(index)
    }

    pub fn waypoint_count(&self) -> usize {
        self.store.len()
    }

    // === Route operations ===

    /// Issues a recalculation for the current waypoints. A quiet no-op when
    /// the control is not attached.
    pub async fn recalculate_route(
        &self,
        skip_center: bool,
    ) -> Result<Option<Arc<RouteResponse>>, RoutingError> {
        match &self.ctx {
            Some(ctx) => {
                ctx.coordinator
                    .recalculate(RecalculateOptions { skip_center })
                    .await
            }
            None => Ok(None),
        }
    }

    pub fn select_route(&self, route_id: u32) -> bool {
        self.ctx
            .as_ref()
            .is_some_and(|ctx| ctx.sync.select_route(route_id))
    }

    pub fn selected_route_id(&self) -> Option<u32> {
        self.ctx.as_ref().and_then(|ctx| ctx.sync.selected_route_id())
    }

    pub fn hide_alternative_routes(&self) {
        if let Some(ctx) = &self.ctx {
            ctx.sync.hide_alternative_routes();
        }
    }

    pub fn show_all_routes(&self) {
        if let Some(ctx) = &self.ctx {
            ctx.sync.show_all_routes();
        }
    }

    /// Fits the viewport to the last response's bounds, if any.
    pub fn zoom_to_data(&self, padding: f64) {
        if let Some(ctx) = &self.ctx {
            if let Some(bounds) = ctx.sync.response().and_then(|response| response.bounds) {
                ctx.map.fit_bounds(bounds, padding);
            }
        }
    }

    // === Event surface ===

    pub fn on(
        &self,
        kind: EventKind,
        callback: impl Fn(&RoutingEvent) + Send + Sync + 'static,
    ) -> HandlerId {
        self.dispatcher.on(kind, callback)
    }

    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        self.dispatcher.off(kind, id)
    }
}

impl Drop for RoutingControl {
    fn drop(&mut self) {
        self.detach();
    }
}
