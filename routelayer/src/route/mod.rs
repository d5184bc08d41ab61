//! Route data model, selection policy, and render synchronization.

pub mod select;
pub mod sync;
pub mod types;

pub use select::{select_route_by_strategy, SelectRouteStrategy};
pub use sync::RenderSync;
pub use types::{ResponseSummary, RouteResponse, RouteSummary, SegmentFeature, Waypoint};
