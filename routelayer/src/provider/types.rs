//! Provider types and traits.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::route::select::SelectRouteStrategy;
use crate::route::types::{RouteResponse, Waypoint};

/// Errors a provider can surface to the coordinator.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider rejected the request as unauthorized. The response body
    /// is attached so the host can inspect it and re-authenticate.
    #[error("provider request unauthorized")]
    Unauthorized { body: serde_json::Value },

    /// Any other non-2xx response or network-level failure.
    #[error("provider transport failure: {0}")]
    Transport(String),

    /// The provider answered but the payload could not be interpreted.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Per-request options handed to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// How many alternative routes to request beyond the primary one.
    pub alternatives: u32,
    /// Strategy the provider should use to pre-select a default route.
    pub strategy: SelectRouteStrategy,
}

/// Contract for external routing providers.
///
/// Implementations must be internally cancellable/replaceable: dropping the
/// returned future must abandon the underlying request.
pub trait RouteProvider: Send + Sync {
    /// Computes candidate routes through the given waypoints.
    ///
    /// At least 2 waypoints are guaranteed by the caller.
    fn request(
        &self,
        waypoints: &[Waypoint],
        options: RequestOptions,
    ) -> BoxFuture<'_, Result<RouteResponse, ProviderError>>;

    /// True while the provider still has route fetches in flight.
    ///
    /// Used to defer annotation rebuilds until requests settle.
    fn has_pending_requests(&self) -> bool;

    /// Releases provider resources (e.g. terminates its own worker) when the
    /// control is detached.
    fn destroy(&self) {}
}
