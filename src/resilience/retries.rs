//! Retry logic.
//!
//! # Responsibilities
//! - Determine if request is retryable (idempotent methods only)
//! - Bound the number of forwarding attempts
//!
//! # Design Decisions
//! - Never retry POST/PUT/DELETE/PATCH (non-idempotent)
//! - Only connection failures are retried; a timeout or a received response is final
//! - A retry goes to a different destination, never the one that just failed
//! - No backoff: the retry targets another destination immediately

use axum::http::Method;

/// Attempt budget for one proxied request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

impl RetryPolicy {
    /// Attempts allowed for a request with `method`.
    pub fn attempts_for(&self, method: &Method) -> usize {
        if is_idempotent(method) {
            self.max_attempts
        } else {
            1
        }
    }
}

/// GET and HEAD are the only methods replayed against another destination.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}
