//! Named-event publish/subscribe.
//!
//! Every component talks to its consumers through a [`Dispatcher`]: a typed
//! multi-map from event kind to an ordered list of callbacks. Subscribers
//! register and unregister by the [`HandlerId`] returned from [`Dispatcher::on`],
//! never by callback identity.
//!
//! Delivery is synchronous and in subscription order. A panicking callback is
//! caught and logged so it cannot prevent delivery to the callbacks behind it.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::route::types::{RouteResponse, Waypoint};

/// Event payloads the core publishes to listeners.
#[derive(Clone)]
pub enum RoutingEvent {
    /// The full ordered waypoint list after any list-changing mutation.
    Waypoints(Vec<Waypoint>),
    /// A newly accepted route response.
    RouteCalculated(Arc<RouteResponse>),
    /// A candidate route became the selected one.
    RouteSelected {
        data: Arc<RouteResponse>,
        route_id: u32,
    },
    /// Drag-in-progress flag from gesture handling.
    Dirty(bool),
}

impl RoutingEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RoutingEvent::Waypoints(_) => EventKind::Waypoints,
            RoutingEvent::RouteCalculated(_) => EventKind::RouteCalculated,
            RoutingEvent::RouteSelected { .. } => EventKind::RouteSelected,
            RoutingEvent::Dirty(_) => EventKind::Dirty,
        }
    }
}

impl std::fmt::Debug for RoutingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RoutingEvent::{:?}", self.kind())
    }
}

/// Names of the events on the core's event surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Waypoints,
    RouteCalculated,
    RouteSelected,
    Dirty,
}

/// Identifies one subscription for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Callback = Arc<dyn Fn(&RoutingEvent) + Send + Sync>;

/// Ordered multi-map pub/sub hub.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Mutex<HashMap<EventKind, Vec<(HandlerId, Callback)>>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `callback` to `kind`. Returns the handle used to
    /// unsubscribe.
    pub fn on(
        &self,
        kind: EventKind,
        callback: impl Fn(&RoutingEvent) + Send + Sync + 'static,
    ) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.handlers.lock().expect("dispatcher poisoned");
        handlers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Removes the subscription identified by `id`. Returns false if it was
    /// not registered for `kind`.
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock().expect("dispatcher poisoned");
        if let Some(list) = handlers.get_mut(&kind) {
            let before = list.len();
            list.retain(|(h, _)| *h != id);
            return list.len() != before;
        }
        false
    }

    /// Delivers `event` to every subscriber of its kind, in subscription
    /// order.
    pub fn fire(&self, event: RoutingEvent) {
        // Snapshot outside the lock so callbacks can subscribe/unsubscribe.
        let snapshot: Vec<Callback> = {
            let handlers = self.handlers.lock().expect("dispatcher poisoned");
            handlers
                .get(&event.kind())
                .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };

        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                warn!(event = ?event.kind(), "event callback panicked; continuing delivery");
            }
        }
    }

    /// Number of subscribers for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers
            .lock()
            .expect("dispatcher poisoned")
            .get(&kind)
            .map_or(0, |list| list.len())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.lock().expect("dispatcher poisoned");
        let mut map = f.debug_map();
        for (kind, list) in handlers.iter() {
            map.entry(kind, &list.len());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_delivery_in_subscription_order() {
        let dispatcher = Dispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..3 {
            let order = Arc::clone(&order);
            dispatcher.on(EventKind::Dirty, move |_| {
                order.lock().unwrap().push(tag);
            });
        }

        dispatcher.fire(RoutingEvent::Dirty(true));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_off_removes_only_that_handler() {
        let dispatcher = Dispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c1 = Arc::clone(&count);
        let first = dispatcher.on(EventKind::Dirty, move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = Arc::clone(&count);
        dispatcher.on(EventKind::Dirty, move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        });

        assert!(dispatcher.off(EventKind::Dirty, first));
        assert!(!dispatcher.off(EventKind::Dirty, first));

        dispatcher.fire(RoutingEvent::Dirty(false));
        assert_eq!(count.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_off_wrong_kind_is_false() {
        let dispatcher = Dispatcher::new();
        let id = dispatcher.on(EventKind::Dirty, |_| {});
        assert!(!dispatcher.off(EventKind::Waypoints, id));
        assert_eq!(dispatcher.subscriber_count(EventKind::Dirty), 1);
    }

    #[test]
    fn test_panicking_callback_does_not_block_later_ones() {
        let dispatcher = Dispatcher::new();
        let reached = Arc::new(AtomicUsize::new(0));

        dispatcher.on(EventKind::Dirty, |_| panic!("listener bug"));
        let r = Arc::clone(&reached);
        dispatcher.on(EventKind::Dirty, move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.fire(RoutingEvent::Dirty(true));
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fire_without_subscribers_is_noop() {
        let dispatcher = Dispatcher::new();
        dispatcher.fire(RoutingEvent::Dirty(true));
    }
}
