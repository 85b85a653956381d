//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy route matched → cluster identified
//!     → cluster.rs (destinations of the cluster)
//!     → round_robin.rs (weighted rotation, unhealthy/excluded skipped)
//!     → backend.rs (destination + in-flight guard)
//!     → Return destination or none
//! ```
//!
//! # Design Decisions
//! - The policy only picks an index; destinations own their health state
//! - Unhealthy destinations excluded from selection until cooldown expiry
//! - Retries pass the indices already tried so a retry never reuses them

use std::sync::Arc;
use std::time::Instant;

pub mod backend;
pub mod cluster;
pub mod round_robin;

pub use backend::{Destination, DestinationGuard};
pub use cluster::ClusterDestinationSet;
pub use round_robin::WeightedRoundRobin;

/// Destination selection policy.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Index of the next destination to use, or `None` if nothing is eligible.
    fn next_server(&self, destinations: &[Arc<Destination>], exclude: &[usize], now: Instant) -> Option<usize>;
}
