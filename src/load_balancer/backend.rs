//! Proxy destination.
//!
//! # Responsibilities
//! - Represent a single destination of a cluster
//! - Track in-flight requests
//! - Carry the destination's health marker

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::health::HealthMarker;
use crate::upstream::BackendDescriptor;

/// A single destination in a cluster.
#[derive(Debug)]
pub struct Destination {
    pub descriptor: BackendDescriptor,
    pub health: HealthMarker,
    /// Number of requests currently forwarded to this destination.
    pub in_flight: AtomicUsize,
}

impl Destination {
    pub fn new(descriptor: BackendDescriptor, cooldown: Duration) -> Self {
        Self {
            descriptor,
            health: HealthMarker::new(cooldown),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn weight(&self) -> u32 {
        self.descriptor.weight.max(1)
    }

    /// Create a guard counting one in-flight request.
    pub fn guard(self: &Arc<Self>) -> DestinationGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        DestinationGuard {
            destination: self.clone(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }
}

/// A RAII guard that manages the in-flight count.
#[derive(Debug)]
pub struct DestinationGuard {
    pub destination: Arc<Destination>,
}

impl Deref for DestinationGuard {
    type Target = Destination;
    fn deref(&self) -> &Self::Target {
        &self.destination
    }
}

impl Drop for DestinationGuard {
    fn drop(&mut self) {
        self.destination.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
