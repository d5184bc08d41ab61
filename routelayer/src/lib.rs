//! RouteLayer - interactive multi-waypoint routing core
//!
//! This library provides the map-agnostic core of an interactive routing
//! layer: a waypoint store, a bounded request coordinator with cancellation
//! and staleness filtering, strategy-based route selection, render-state
//! synchronization, and a viewport-driven annotation placement engine.
//!
//! # High-Level API
//!
//! Hosts construct a [`control::RoutingControl`], attach it to an
//! implementation of [`map::MapHost`], and mutate waypoints:
//!
//! ```ignore
//! use routelayer::control::{RoutingControl, RoutingOptions};
//!
//! let mut control = RoutingControl::new(RoutingOptions {
//!     provider: Some(provider),
//!     ..RoutingOptions::default()
//! });
//! control.attach(map);
//!
//! control.add_waypoint(origin, 0, None);
//! control.add_waypoint(destination, 1, None);
//! let response = control.recalculate_route(false).await?;
//! ```

pub mod annotation;
pub mod control;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod geo;
pub mod interaction;
pub mod logging;
pub mod map;
pub mod plugin;
pub mod provider;
pub mod route;
pub mod throttle;
pub mod waypoints;

/// Version of the routelayer library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
