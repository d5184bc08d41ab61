//! Request coordination.
//!
//! The [`RequestCoordinator`] turns the mutable waypoint list into a
//! sequence of asynchronous provider requests while guarding the published
//! state against races:
//!
//! - a bounded in-flight pool ([`pool`]) with FIFO eviction caps concurrent
//!   provider work;
//! - a per-coordinator "latest accepted issue time" watermark rejects stale
//!   results, so the published route always corresponds to the most recently
//!   *issued* request regardless of network completion order;
//! - the very first accepted response may auto-center the viewport.
//!
//! Stale and evicted requests resolve to `Ok(None)`; they are expected race
//! outcomes, not faults.

mod pool;

pub use pool::{RequestPool, Ticket, MAX_IN_FLIGHT_REQUESTS};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, trace};

use crate::error::RoutingError;
use crate::event::{Dispatcher, RoutingEvent};
use crate::map::MapHost;
use crate::provider::{RequestOptions, RouteProvider};
use crate::route::select::SelectRouteStrategy;
use crate::route::sync::RenderSync;
use crate::route::types::RouteResponse;
use crate::waypoints::WaypointStore;

/// Viewport padding in pixels used for the first-response bounds fit.
pub const AUTO_CENTER_PADDING: f64 = 40.0;

/// Static coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Alternative routes requested beyond the primary one.
    pub alternatives: u32,
    /// Request zero alternatives whenever the trip has more than two
    /// waypoints. Alternatives are only meaningful for simple A→B trips.
    pub skip_alternatives_on_multiple_waypoints: bool,
    /// Allow the first accepted response to fit the viewport to its bounds.
    pub first_route_center: bool,
    /// Default-route selection strategy forwarded to the provider.
    pub strategy: SelectRouteStrategy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            alternatives: 1,
            skip_alternatives_on_multiple_waypoints: true,
            first_route_center: true,
            strategy: SelectRouteStrategy::Fastest,
        }
    }
}

/// Per-call options for [`RequestCoordinator::recalculate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RecalculateOptions {
    /// Suppress auto-centering even for the first accepted response.
    pub skip_center: bool,
}

pub struct RequestCoordinator {
    store: Arc<WaypointStore>,
    provider: Option<Arc<dyn RouteProvider>>,
    sync: Arc<RenderSync>,
    map: Arc<dyn MapHost>,
    dispatcher: Arc<Dispatcher>,
    config: CoordinatorConfig,
    pool: Mutex<RequestPool>,
    /// Issue time of the newest accepted response. Owned by this instance;
    /// there is no ambient global.
    latest_accepted_issue: Mutex<Option<Instant>>,
    has_published: AtomicBool,
}

impl RequestCoordinator {
    pub fn new(
        store: Arc<WaypointStore>,
        provider: Option<Arc<dyn RouteProvider>>,
        sync: Arc<RenderSync>,
        map: Arc<dyn MapHost>,
        dispatcher: Arc<Dispatcher>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            provider,
            sync,
            map,
            dispatcher,
            config,
            pool: Mutex::new(RequestPool::default()),
            latest_accepted_issue: Mutex::new(None),
            has_published: AtomicBool::new(false),
        }
    }

    /// Issues one provider request for the current waypoint list and, when
    /// the result is accepted, publishes it.
    ///
    /// Returns `Ok(None)` when fewer than 2 waypoints exist (no side
    /// effects), when the request was evicted from the pool, or when the
    /// result arrived stale. Configuration and provider failures are
    /// returned as typed errors; nothing is retried automatically.
    pub async fn recalculate(
        &self,
        options: RecalculateOptions,
    ) -> Result<Option<Arc<RouteResponse>>, RoutingError> {
        let waypoints = self.store.snapshot();
        if waypoints.len() < 2 {
            trace!(count = waypoints.len(), "recalculate below waypoint threshold");
            return Ok(None);
        }

        let provider = self
            .provider
            .as_ref()
            .ok_or(RoutingError::NoProvider)?
            .clone();

        let request_options = RequestOptions {
            alternatives: self.alternatives_for(waypoints.len()),
            strategy: self.config.strategy,
        };

        let ticket = self.pool.lock().expect("request pool poisoned").admit();
        trace!(ticket = ticket.id, alternatives = request_options.alternatives, "request issued");

        let result = tokio::select! {
            biased;
            _ = ticket.token.cancelled() => {
                debug!(ticket = ticket.id, "request evicted before completion");
                return Ok(None);
            }
            result = provider.request(&waypoints, request_options) => result,
        };

        self.pool
            .lock()
            .expect("request pool poisoned")
            .settle(ticket.id);

        let response = result.map_err(RoutingError::from)?;

        // Staleness guard: accept only if no later-issued request has
        // already been accepted.
        {
            let mut watermark = self
                .latest_accepted_issue
                .lock()
                .expect("watermark poisoned");
            match *watermark {
                Some(latest) if latest > ticket.issued_at => {
                    debug!(ticket = ticket.id, "stale response discarded");
                    return Ok(None);
                }
                _ => *watermark = Some(ticket.issued_at),
            }
        }

        let response = Arc::new(response);
        let first_accepted = !self.has_published.swap(true, Ordering::SeqCst);

        self.sync.set_route_data(Arc::clone(&response));
        self.dispatcher
            .fire(RoutingEvent::RouteCalculated(Arc::clone(&response)));

        if let Some(route_id) = response.summary.selected_route_id {
            self.dispatcher.fire(RoutingEvent::RouteSelected {
                data: Arc::clone(&response),
                route_id,
            });
        }

        if first_accepted
            && waypoints.len() == 2
            && !options.skip_center
            && self.config.first_route_center
        {
            if let Some(bounds) = response.bounds {
                debug!("auto-centering on first accepted response");
                self.map.fit_bounds(bounds, AUTO_CENTER_PADDING);
            }
        }

        Ok(Some(response))
    }

    /// Number of unresolved provider requests currently admitted.
    pub fn outstanding_requests(&self) -> usize {
        self.pool.lock().expect("request pool poisoned").outstanding()
    }

    fn alternatives_for(&self, waypoint_count: usize) -> u32 {
        if self.config.skip_alternatives_on_multiple_waypoints && waypoint_count != 2 {
            0
        } else {
            self.config.alternatives
        }
    }
}
