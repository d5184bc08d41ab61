//! Annotation placement engine.
//!
//! Places exactly one label anchor per distinct visible route segment chunk,
//! stable under small viewport changes. Geometry work (chunking, clipping,
//! anchor computation) runs behind the [`AnnotationEngine`] interface, by
//! default in a worker task; orchestration, caching, and hit-testing stay on
//! the interactive side in the [`AnnotationController`].

pub mod controller;
pub mod engine;
pub mod geometry;

pub use controller::{
    AnnotationAnchor, AnnotationController, AnnotationOptions, AnnotationView, PassOutcome,
};
pub use engine::{AnnotationEngine, InProcessEngine, WorkerEngine};
pub use geometry::{AnchorCandidate, AnchorSide, Chunk, PlacementResult};

use std::sync::Arc;

use tracing::warn;

use crate::control::RoutingContext;
use crate::event::{EventKind, HandlerId, RoutingEvent};
use crate::plugin::Plugin;
use crate::throttle::Debounce;

/// Control plugin wiring the annotation controller to the event surface.
///
/// Subscribes to `routeCalculated` for forced rebuilds and exposes
/// [`AnnotationPlugin::notify_move_end`] for the host to forward viewport
/// move-end events into the debounced recheck path.
pub struct AnnotationPlugin {
    options: AnnotationOptions,
    view: Arc<dyn AnnotationView>,
    engine_override: Option<Arc<dyn AnnotationEngine>>,
    engine: Option<Arc<dyn AnnotationEngine>>,
    controller: Option<Arc<AnnotationController>>,
    debounce: Option<Debounce>,
    subscription: Option<HandlerId>,
}

impl AnnotationPlugin {
    pub fn new(view: Arc<dyn AnnotationView>, options: AnnotationOptions) -> Self {
        Self {
            options,
            view,
            engine_override: None,
            engine: None,
            controller: None,
            debounce: None,
            subscription: None,
        }
    }

    /// Swaps the default worker engine for another role (e.g. the
    /// in-process one). Callers cannot observe the difference.
    pub fn with_engine(mut self, engine: Arc<dyn AnnotationEngine>) -> Self {
        self.engine_override = Some(engine);
        self
    }

    /// Host entry point for viewport move-end events. Bursts collapse into
    /// a single placement pass after the debounce window.
    pub fn notify_move_end(&self) {
        if let Some(debounce) = &self.debounce {
            debounce.call();
        }
    }

    /// The live controller, once attached.
    pub fn controller(&self) -> Option<Arc<AnnotationController>> {
        self.controller.clone()
    }
}

impl Plugin for AnnotationPlugin {
    fn on_add(&mut self, ctx: &Arc<RoutingContext>) {
        let Some(provider) = ctx.provider.clone() else {
            warn!("annotation plugin attached without a provider; staying inert");
            return;
        };

        let engine = self
            .engine_override
            .clone()
            .unwrap_or_else(|| Arc::new(WorkerEngine::spawn()) as Arc<dyn AnnotationEngine>);

        let controller = Arc::new(AnnotationController::new(
            Arc::clone(&ctx.map),
            Arc::clone(&engine),
            Arc::clone(&self.view),
            provider,
            self.options.clone(),
        ));

        let runtime = tokio::runtime::Handle::current();

        let pass_controller = Arc::clone(&controller);
        let pass_runtime = runtime.clone();
        self.debounce = Some(Debounce::new(self.options.debounce, move || {
            let controller = Arc::clone(&pass_controller);
            pass_runtime.spawn(async move {
                controller.run_pass(false).await;
            });
        }));

        let rebuild_controller = Arc::clone(&controller);
        self.subscription = Some(ctx.dispatcher.on(EventKind::RouteCalculated, move |event| {
            if let RoutingEvent::RouteCalculated(data) = event {
                let controller = Arc::clone(&rebuild_controller);
                let data = Arc::clone(data);
                runtime.spawn(async move {
                    controller.handle_route_calculated(data).await;
                });
            }
        }));

        self.engine = Some(engine);
        self.controller = Some(controller);
    }

    fn on_remove(&mut self, ctx: &Arc<RoutingContext>) {
        if let Some(id) = self.subscription.take() {
            ctx.dispatcher.off(EventKind::RouteCalculated, id);
        }
        self.debounce = None;
        self.controller = None;
        // Dropping the last engine handle stops the worker task, which
        // implicitly cancels queued geometry calls.
        self.engine = None;
        self.view.clear();
    }
}
