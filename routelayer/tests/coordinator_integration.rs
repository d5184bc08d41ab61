//! Integration tests for the request coordination pipeline.
//!
//! These tests verify the complete request flows:
//! - Waypoint store → Coordinator → Provider → Render sync → Events
//! - Out-of-order completion and the staleness watermark
//! - Bounded admission with oldest-first eviction
//! - First-response auto-centering
//! - Typed error propagation
//!
//! Run with: `cargo test --test coordinator_integration`

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::oneshot;

use routelayer::coordinator::{
    CoordinatorConfig, RecalculateOptions, RequestCoordinator, MAX_IN_FLIGHT_REQUESTS,
};
use routelayer::error::RoutingError;
use routelayer::event::{Dispatcher, EventKind, RoutingEvent};
use routelayer::geo::{BBox, LngLat};
use routelayer::map::{MapHost, RenderedFeature};
use routelayer::provider::{ProviderError, RequestOptions, RouteProvider};
use routelayer::route::sync::RenderSync;
use routelayer::route::types::{
    ResponseSummary, RouteResponse, RouteSummary, SegmentFeature, Waypoint,
};
use routelayer::waypoints::WaypointStore;

// ============================================================================
// Test Helpers
// ============================================================================

/// Map host that records viewport fits and ignores source updates.
struct RecordingHost {
    fit_calls: Mutex<Vec<BBox>>,
}

impl RecordingHost {
    fn new() -> Self {
        Self {
            fit_calls: Mutex::new(Vec::new()),
        }
    }

    fn fit_count(&self) -> usize {
        self.fit_calls.lock().unwrap().len()
    }
}

impl MapHost for RecordingHost {
    fn set_geojson_source(&self, _source_id: &str, _data: geojson::FeatureCollection) {}

    fn remove_source(&self, _source_id: &str) {}

    fn query_rendered_features(&self, _position: LngLat, _layers: &[&str]) -> Vec<RenderedFeature> {
        Vec::new()
    }

    fn viewport_bounds(&self) -> BBox {
        BBox::new(-180.0, -85.0, 180.0, 85.0)
    }

    fn fit_bounds(&self, bounds: BBox, _padding: f64) {
        self.fit_calls.lock().unwrap().push(bounds);
    }
}

/// Provider whose requests block until the test resolves their gate.
///
/// Each call to `request` consumes the next queued gate in FIFO order; a call
/// with no gate queued resolves immediately with a default response.
struct GatedProvider {
    gates: Mutex<VecDeque<oneshot::Receiver<Result<RouteResponse, ProviderError>>>>,
    in_flight: AtomicUsize,
}

impl GatedProvider {
    fn new() -> Self {
        Self {
            gates: Mutex::new(VecDeque::new()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Queues a gate for the next request and returns its resolver.
    fn push_gate(&self) -> oneshot::Sender<Result<RouteResponse, ProviderError>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }
}

impl RouteProvider for GatedProvider {
    fn request(
        &self,
        _waypoints: &[Waypoint],
        _options: RequestOptions,
    ) -> BoxFuture<'_, Result<RouteResponse, ProviderError>> {
        let gate = self.gates.lock().unwrap().pop_front();
        Box::pin(async move {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            let result = match gate {
                Some(gate) => gate
                    .await
                    .unwrap_or_else(|_| Err(ProviderError::Transport("gate dropped".into()))),
                None => Ok(response("ungated")),
            };
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }

    fn has_pending_requests(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }
}

/// A minimal one-route response tagged so tests can tell responses apart.
fn response(marker: &str) -> RouteResponse {
    let now = chrono::Utc::now();
    RouteResponse {
        raw_data: serde_json::json!({ "marker": marker }),
        geometry: vec![SegmentFeature {
            coordinates: vec![LngLat::new(9.98, 53.55), LngLat::new(10.0, 53.56)],
            route_index: 0,
            waypoint_index: 0,
            selected: true,
        }],
        bounds: Some(BBox::new(9.98, 53.55, 10.0, 53.56)),
        summary: ResponseSummary {
            routes: vec![RouteSummary {
                id: 0,
                total_time: 600.0,
                distance: 2500.0,
                cost: None,
                arrive_time: now + chrono::Duration::minutes(10),
                departure_time: now,
            }],
            selected_route_id: Some(0),
        },
    }
}

fn marker_of(response: &RouteResponse) -> &str {
    response.raw_data["marker"].as_str().unwrap_or("")
}

struct Harness {
    coordinator: Arc<RequestCoordinator>,
    provider: Arc<GatedProvider>,
    sync: Arc<RenderSync>,
    host: Arc<RecordingHost>,
    dispatcher: Arc<Dispatcher>,
    store: Arc<WaypointStore>,
}

fn harness(config: CoordinatorConfig) -> Harness {
    let dispatcher = Arc::new(Dispatcher::new());
    let host = Arc::new(RecordingHost::new());
    let map: Arc<dyn MapHost> = Arc::clone(&host) as Arc<dyn MapHost>;
    let store = Arc::new(WaypointStore::new(Arc::clone(&dispatcher)));
    let sync = Arc::new(RenderSync::new(
        Arc::clone(&map),
        Arc::clone(&dispatcher),
        "route-src",
        "waypoints-src",
    ));
    let provider = Arc::new(GatedProvider::new());

    let coordinator = Arc::new(RequestCoordinator::new(
        Arc::clone(&store),
        Some(Arc::clone(&provider) as Arc<dyn RouteProvider>),
        Arc::clone(&sync),
        map,
        Arc::clone(&dispatcher),
        config,
    ));

    Harness {
        coordinator,
        provider,
        sync,
        host,
        dispatcher,
        store,
    }
}

fn two_waypoint_trip(store: &WaypointStore) {
    store.insert(LngLat::new(9.988, 53.630), 0, None);
    store.insert(LngLat::new(10.006, 53.553), 1, None);
}

/// Give spawned request futures time to reach their gate.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

// ============================================================================
// Staleness Watermark
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_late_completion_of_older_request_is_discarded() {
    let h = harness(CoordinatorConfig::default());
    two_waypoint_trip(&h.store);

    let gate_a = h.provider.push_gate();
    let coordinator_a = Arc::clone(&h.coordinator);
    let task_a =
        tokio::spawn(async move { coordinator_a.recalculate(RecalculateOptions::default()).await });
    settle().await;

    let gate_b = h.provider.push_gate();
    let coordinator_b = Arc::clone(&h.coordinator);
    let task_b =
        tokio::spawn(async move { coordinator_b.recalculate(RecalculateOptions::default()).await });
    settle().await;

    // The newer request finishes first and gets published.
    gate_b.send(Ok(response("newer"))).unwrap();
    let accepted = task_b.await.unwrap().unwrap().expect("newer accepted");
    assert_eq!(marker_of(&accepted), "newer");

    // The older request finishes afterwards: silently discarded.
    gate_a.send(Ok(response("older"))).unwrap();
    let stale = task_a.await.unwrap().unwrap();
    assert!(stale.is_none(), "older completion must not be published");

    let published = h.sync.response().expect("a response is published");
    assert_eq!(marker_of(&published), "newer");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_in_order_completions_both_publish() {
    let h = harness(CoordinatorConfig::default());
    two_waypoint_trip(&h.store);

    let gate_a = h.provider.push_gate();
    let coordinator_a = Arc::clone(&h.coordinator);
    let task_a =
        tokio::spawn(async move { coordinator_a.recalculate(RecalculateOptions::default()).await });
    settle().await;

    gate_a.send(Ok(response("first"))).unwrap();
    assert!(task_a.await.unwrap().unwrap().is_some());

    let gate_b = h.provider.push_gate();
    let coordinator_b = Arc::clone(&h.coordinator);
    let task_b =
        tokio::spawn(async move { coordinator_b.recalculate(RecalculateOptions::default()).await });
    settle().await;

    gate_b.send(Ok(response("second"))).unwrap();
    assert!(task_b.await.unwrap().unwrap().is_some());

    let published = h.sync.response().expect("a response is published");
    assert_eq!(marker_of(&published), "second");
}

// ============================================================================
// Bounded Admission
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_admission_is_bounded_and_evicts_oldest_first() {
    let h = harness(CoordinatorConfig::default());
    two_waypoint_trip(&h.store);

    let mut gates = Vec::new();
    let mut tasks = Vec::new();
    for _ in 0..6 {
        gates.push(h.provider.push_gate());
        let coordinator = Arc::clone(&h.coordinator);
        tasks.push(tokio::spawn(async move {
            coordinator.recalculate(RecalculateOptions::default()).await
        }));
        settle().await;
    }

    assert_eq!(h.coordinator.outstanding_requests(), MAX_IN_FLIGHT_REQUESTS);

    // The two oldest were evicted and resolve to no-ops without their gates
    // ever firing.
    let mut tasks = tasks.into_iter();
    for _ in 0..2 {
        let evicted = tasks.next().unwrap().await.unwrap().unwrap();
        assert!(evicted.is_none(), "evicted request must resolve to a no-op");
    }

    // The four survivors complete normally, in issue order.
    for (i, gate) in gates.into_iter().enumerate().skip(2) {
        gate.send(Ok(response(&format!("req-{i}")))).unwrap();
        let accepted = tasks.next().unwrap().await.unwrap().unwrap();
        assert!(accepted.is_some());
    }

    assert_eq!(h.coordinator.outstanding_requests(), 0);
    let published = h.sync.response().expect("a response is published");
    assert_eq!(marker_of(&published), "req-5");
}

// ============================================================================
// Auto-Centering
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_first_accepted_response_centers_once() {
    let h = harness(CoordinatorConfig::default());
    two_waypoint_trip(&h.store);

    h.coordinator
        .recalculate(RecalculateOptions::default())
        .await
        .unwrap()
        .expect("response accepted");
    assert_eq!(h.host.fit_count(), 1);

    h.coordinator
        .recalculate(RecalculateOptions::default())
        .await
        .unwrap()
        .expect("response accepted");
    assert_eq!(h.host.fit_count(), 1, "only the first response centers");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_skip_center_suppresses_the_first_fit() {
    let h = harness(CoordinatorConfig::default());
    two_waypoint_trip(&h.store);

    h.coordinator
        .recalculate(RecalculateOptions { skip_center: true })
        .await
        .unwrap()
        .expect("response accepted");
    assert_eq!(h.host.fit_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_multi_waypoint_trip_never_auto_centers() {
    let h = harness(CoordinatorConfig::default());
    two_waypoint_trip(&h.store);
    h.store.insert(LngLat::new(9.9, 53.4), 2, None);

    h.coordinator
        .recalculate(RecalculateOptions::default())
        .await
        .unwrap()
        .expect("response accepted");
    assert_eq!(h.host.fit_count(), 0);
}

// ============================================================================
// Events and Errors
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_accepted_response_fires_calculated_then_selected() {
    let h = harness(CoordinatorConfig::default());
    two_waypoint_trip(&h.store);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    h.dispatcher.on(EventKind::RouteCalculated, move |_| {
        sink.lock().unwrap().push("calculated");
    });
    let sink = Arc::clone(&events);
    h.dispatcher.on(EventKind::RouteSelected, move |event| {
        if let RoutingEvent::RouteSelected { route_id, .. } = event {
            assert_eq!(*route_id, 0);
        }
        sink.lock().unwrap().push("selected");
    });

    h.coordinator
        .recalculate(RecalculateOptions::default())
        .await
        .unwrap()
        .expect("response accepted");

    assert_eq!(*events.lock().unwrap(), vec!["calculated", "selected"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stale_response_fires_no_events() {
    let h = harness(CoordinatorConfig::default());
    two_waypoint_trip(&h.store);

    let calculated = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&calculated);
    h.dispatcher.on(EventKind::RouteCalculated, move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    });

    let gate_a = h.provider.push_gate();
    let coordinator_a = Arc::clone(&h.coordinator);
    let task_a =
        tokio::spawn(async move { coordinator_a.recalculate(RecalculateOptions::default()).await });
    settle().await;

    let gate_b = h.provider.push_gate();
    let coordinator_b = Arc::clone(&h.coordinator);
    let task_b =
        tokio::spawn(async move { coordinator_b.recalculate(RecalculateOptions::default()).await });
    settle().await;

    gate_b.send(Ok(response("newer"))).unwrap();
    task_b.await.unwrap().unwrap();
    gate_a.send(Ok(response("older"))).unwrap();
    task_a.await.unwrap().unwrap();

    assert_eq!(calculated.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_provider_failure_propagates_as_typed_error() {
    let h = harness(CoordinatorConfig::default());
    two_waypoint_trip(&h.store);

    let gate = h.provider.push_gate();
    let coordinator = Arc::clone(&h.coordinator);
    let task =
        tokio::spawn(async move { coordinator.recalculate(RecalculateOptions::default()).await });
    settle().await;

    gate.send(Err(ProviderError::Transport("503".into()))).unwrap();
    let result = task.await.unwrap();
    assert!(matches!(
        result,
        Err(RoutingError::Provider(ProviderError::Transport(_)))
    ));

    // A failed request never publishes anything.
    assert!(h.sync.response().is_none());
    assert_eq!(h.coordinator.outstanding_requests(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_failure_carries_the_body() {
    let h = harness(CoordinatorConfig::default());
    two_waypoint_trip(&h.store);

    let gate = h.provider.push_gate();
    let coordinator = Arc::clone(&h.coordinator);
    let task =
        tokio::spawn(async move { coordinator.recalculate(RecalculateOptions::default()).await });
    settle().await;

    gate.send(Err(ProviderError::Unauthorized {
        body: serde_json::json!({ "error": "token expired" }),
    }))
    .unwrap();

    match task.await.unwrap() {
        Err(RoutingError::Provider(ProviderError::Unauthorized { body })) => {
            assert_eq!(body["error"], "token expired");
        }
        other => panic!("expected unauthorized error, got {other:?}"),
    }
}
