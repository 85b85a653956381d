//! Cluster destination sets.
//!
//! # Responsibilities
//! - Hold the destinations of one proxy cluster
//! - Apply the load balancing policy to select a destination
//! - Let retries exclude destinations already tried

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::load_balancer::{backend::Destination, round_robin::WeightedRoundRobin, LoadBalancer};
use crate::upstream::BackendDescriptor;

/// The destinations of one cluster plus its selection policy.
#[derive(Debug)]
pub struct ClusterDestinationSet {
    id: String,
    destinations: Vec<Arc<Destination>>,
    policy: Box<dyn LoadBalancer>,
}

impl ClusterDestinationSet {
    pub fn new(id: &str, descriptors: Vec<BackendDescriptor>, cooldown: Duration) -> Self {
        Self {
            id: id.to_string(),
            destinations: descriptors
                .into_iter()
                .map(|d| Arc::new(Destination::new(d, cooldown)))
                .collect(),
            policy: Box::new(WeightedRoundRobin::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn destinations(&self) -> &[Arc<Destination>] {
        &self.destinations
    }

    /// Pick the next eligible destination, skipping indices in `exclude`.
    pub fn select(&self, exclude: &[usize]) -> Option<(usize, Arc<Destination>)> {
        match self.policy.next_server(&self.destinations, exclude, Instant::now()) {
            Some(index) => Some((index, self.destinations[index].clone())),
            None => {
                tracing::debug!(
                    cluster = %self.id,
                    destinations = self.destinations.len(),
                    excluded = exclude.len(),
                    "No eligible destination in cluster"
                );
                None
            }
        }
    }

    /// Number of destinations currently eligible for selection.
    pub fn healthy_count(&self) -> usize {
        self.destinations.iter().filter(|d| d.health.is_healthy()).count()
    }
}
