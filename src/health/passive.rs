//! Passive health checking (failure detection).
//!
//! # Responsibilities
//! - Classify the outcome of each forwarding attempt
//! - Apply the outcome to the destination's health marker
//!
//! # Design Decisions
//! - Connection errors and timeouts count as failures
//! - Any received response, 5xx included, proves the destination is reachable
//! - A failed active probe (non-2xx on the probe path) counts as a failure
//! - A client cancellation says nothing about the destination and is ignored

use axum::http::StatusCode;

use crate::load_balancer::Destination;
use crate::observability::metrics;

/// Result of one forwarding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Response(StatusCode),
    ProbeFailed(StatusCode),
    ConnectError,
    Timeout,
    Cancelled,
}

impl AttemptOutcome {
    /// Whether this outcome marks the destination unhealthy.
    pub fn is_failure(&self) -> bool {
        match self {
            AttemptOutcome::Response(_) | AttemptOutcome::Cancelled => false,
            AttemptOutcome::ProbeFailed(_) | AttemptOutcome::ConnectError | AttemptOutcome::Timeout => true,
        }
    }
}

/// Update `destination` health from an attempt outcome.
pub fn observe(destination: &Destination, outcome: AttemptOutcome) {
    if outcome == AttemptOutcome::Cancelled {
        return;
    }

    let id = destination.descriptor.id.as_str();
    let cluster = destination.descriptor.cluster_id.as_deref().unwrap_or_default();
    if outcome.is_failure() {
        if destination.health.mark_failure() {
            tracing::warn!(
                cluster = %cluster,
                destination = %id,
                outcome = ?outcome,
                cooldown_secs = destination.health.cooldown().as_secs(),
                "Destination marked unhealthy"
            );
        }
        metrics::record_destination_health(cluster, id, false);
    } else {
        if destination.health.mark_success() {
            tracing::info!(cluster = %cluster, destination = %id, "Destination recovered");
        }
        metrics::record_destination_health(cluster, id, true);
    }
}
