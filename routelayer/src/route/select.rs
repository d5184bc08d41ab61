//! Route selection strategies.
//!
//! A pure policy function over route summaries. No side effects; callers
//! (typically providers pre-selecting a default route) apply the returned id
//! themselves.

use serde::{Deserialize, Serialize};

use crate::route::types::RouteSummary;

/// Policy for picking the "best" candidate among alternatives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectRouteStrategy {
    /// Minimal arrival time.
    #[default]
    Fastest,
    /// Minimal distance.
    Shortest,
    /// Minimal cost among routes that carry one.
    Cheapest,
    /// No selection; all candidates stay equal-weighted.
    None,
}

/// Picks a route id by `strategy`, or `None` when the strategy makes no
/// selection.
///
/// An empty summary list is valid input and yields `None` for every
/// strategy. Ties go to the first candidate encountered. `Cheapest` ignores
/// routes without a cost entirely; when no route carries a cost the result
/// is `None`.
pub fn select_route_by_strategy(
    routes: &[RouteSummary],
    strategy: SelectRouteStrategy,
) -> Option<u32> {
    match strategy {
        SelectRouteStrategy::Fastest => routes
            .iter()
            .min_by_key(|route| route.arrive_time)
            .map(|route| route.id),
        SelectRouteStrategy::Shortest => routes
            .iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .map(|route| route.id),
        SelectRouteStrategy::Cheapest => routes
            .iter()
            .filter_map(|route| route.cost.map(|cost| (route, cost)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(route, _)| route.id),
        SelectRouteStrategy::None => None,
    }
}
