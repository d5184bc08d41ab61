//! Error taxonomy for the routing core.
//!
//! Only genuine faults become errors. A stale result superseded by a
//! later-issued request, an evicted in-flight request, and a recalculation
//! with fewer than 2 waypoints are all expected outcomes and surface as
//! `Ok(None)` from the coordinator, never as an `Err`.

use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum RoutingError {
    /// `recalculate` was called with no provider configured. Fatal to the
    /// call; never swallowed.
    #[error("no data provider configured")]
    NoProvider,

    /// The provider failed (unauthorized, transport, or malformed payload).
    /// Surfaced as-is; the coordinator never retries automatically.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
