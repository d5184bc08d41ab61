//! Ordered, mutable waypoint list.
//!
//! The store is the single source of truth for route endpoints. Indices are
//! positional: insertion order is route order, and indices stay contiguous
//! `0..n-1`. All mutation goes through the store's own operations; each is
//! synchronous and atomic with respect to its event emission.
//!
//! Every mutation that changes the list fires [`RoutingEvent::Waypoints`]
//! with the complete new ordered list, never a diff, so downstream consumers
//! always resync to full current state.

use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::event::{Dispatcher, RoutingEvent};
use crate::geo::LngLat;
use crate::route::types::Waypoint;

pub struct WaypointStore {
    dispatcher: Arc<Dispatcher>,
    waypoints: Mutex<Vec<Waypoint>>,
}

impl WaypointStore {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            waypoints: Mutex::new(Vec::new()),
        }
    }

    /// Replaces the whole list.
    pub fn set_all(&self, points: Vec<Waypoint>) {
        let snapshot = {
            let mut waypoints = self.waypoints.lock().expect("waypoint store poisoned");
            *waypoints = points;
            waypoints.clone()
        };
        self.fire(snapshot);
    }

    /// Inserts a waypoint at `index` (clamped into range).
    pub fn insert(&self, point: LngLat, index: usize, mapped_pos: Option<LngLat>) {
        let snapshot = {
            let mut waypoints = self.waypoints.lock().expect("waypoint store poisoned");
            let index = index.min(waypoints.len());
            waypoints.insert(index, Waypoint::with_mapped(point, mapped_pos));
            waypoints.clone()
        };
        trace!(index, count = snapshot.len(), "waypoint inserted");
        self.fire(snapshot);
    }

    /// Moves the waypoint at `index` to a new position.
    ///
    /// Returns `false` without firing any event when the index is out of
    /// range or the new position is coordinate-equal to the stored one. That
    /// makes non-moving drags free for every downstream consumer.
    pub fn update(&self, point: LngLat, index: usize, mapped_pos: Option<LngLat>) -> bool {
        let snapshot = {
            let mut waypoints = self.waypoints.lock().expect("waypoint store poisoned");
            match waypoints.get(index) {
                Some(current) if current.original_pos != point => {
                    waypoints[index] = Waypoint::with_mapped(point, mapped_pos);
                    waypoints.clone()
                }
                _ => return false,
            }
        };
        self.fire(snapshot);
        true
    }

    /// Removes the waypoint at `index`; out-of-range is a no-op.
    pub fn remove(&self, index: usize) {
        let snapshot = {
            let mut waypoints = self.waypoints.lock().expect("waypoint store poisoned");
            if index >= waypoints.len() {
                return;
            }
            waypoints.remove(index);
            waypoints.clone()
        };
        trace!(index, count = snapshot.len(), "waypoint removed");
        self.fire(snapshot);
    }

    pub fn get(&self, index: usize) -> Option<Waypoint> {
        self.waypoints
            .lock()
            .expect("waypoint store poisoned")
            .get(index)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.waypoints.lock().expect("waypoint store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full ordered copy of the current list.
    pub fn snapshot(&self) -> Vec<Waypoint> {
        self.waypoints.lock().expect("waypoint store poisoned").clone()
    }

    fn fire(&self, snapshot: Vec<Waypoint>) {
        self.dispatcher.fire(RoutingEvent::Waypoints(snapshot));
    }
}
