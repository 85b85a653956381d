//! Destination health state machine.
//!
//! # States
//! - Healthy: destination receives traffic
//! - Unhealthy: destination skipped by selection until its cooldown elapses
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: a failed attempt (connect error, timeout, failed probe)
//! Unhealthy → Healthy: a successful attempt, or the cooldown window elapsing
//! ```
//!
//! # Design Decisions
//! - One atomic word per destination; no locks on the request path
//! - Cooldown expiry is evaluated lazily at selection time, no timer needed
//! - State changes logged for observability by the caller

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Health State enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

/// Failure marker with a cooldown window.
#[derive(Debug)]
pub struct HealthMarker {
    epoch: Instant,
    cooldown: Duration,
    /// Milliseconds since `epoch` of the last failure, plus one. Zero means healthy.
    failed_at: AtomicU64,
}

impl HealthMarker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            cooldown,
            failed_at: AtomicU64::new(0),
        }
    }

    /// State as observed at `now`.
    pub fn state_at(&self, now: Instant) -> HealthState {
        let marked = self.failed_at.load(Ordering::Acquire);
        if marked == 0 {
            return HealthState::Healthy;
        }
        let failed_at = self.epoch + Duration::from_millis(marked - 1);
        if now.saturating_duration_since(failed_at) >= self.cooldown {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.state_at(Instant::now()) == HealthState::Healthy
    }

    /// Record a failed attempt. Returns true if the destination was healthy before.
    pub fn mark_failure(&self) -> bool {
        let was_healthy = self.is_healthy();
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        self.failed_at.store(now_ms + 1, Ordering::Release);
        was_healthy
    }

    /// Record a successful attempt. Returns true if a failure mark was cleared.
    pub fn mark_success(&self) -> bool {
        self.failed_at.swap(0, Ordering::AcqRel) != 0
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
