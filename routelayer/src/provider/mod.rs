//! Routing data provider abstraction.
//!
//! The core never computes paths itself; it orchestrates an external routing
//! provider behind the [`RouteProvider`] trait. Concrete implementations
//! (HTTP clients for routing services) live with the host application, which
//! also owns their wire format, authentication, and any worker they run in.

mod types;

pub use types::{ProviderError, RequestOptions, RouteProvider};
