//! Weighted round-robin load balancing strategy.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::health::HealthState;
use crate::load_balancer::{backend::Destination, LoadBalancer};

#[derive(Debug, Default)]
struct Cursor {
    index: usize,
    served: u32,
}

/// Round-robin selector.
/// A destination with weight `w` is picked for `w` consecutive turns before
/// the rotation moves on.
#[derive(Debug, Default)]
pub struct WeightedRoundRobin {
    cursor: Mutex<Cursor>,
}

impl WeightedRoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for WeightedRoundRobin {
    fn next_server(&self, destinations: &[Arc<Destination>], exclude: &[usize], now: Instant) -> Option<usize> {
        let len = destinations.len();
        if len == 0 {
            return None;
        }

        let mut cursor = match self.cursor.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // One step to finish the current destination's turns, then one per destination.
        for _ in 0..=len {
            let index = cursor.index % len;
            let destination = &destinations[index];
            let eligible = !exclude.contains(&index)
                && destination.health.state_at(now) == HealthState::Healthy;

            if eligible && cursor.served < destination.weight() {
                cursor.served += 1;
                return Some(index);
            }

            cursor.index = (index + 1) % len;
            cursor.served = 0;
        }
        None
    }
}
