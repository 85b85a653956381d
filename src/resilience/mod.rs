//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (per-route deadline, client cancellation)
//!     → On connect failure: retries.rs (idempotent proxy requests get one more destination)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries only for idempotent requests (GET, HEAD)
//! - Bridge calls are never retried
//! - Cancellation is an explicit token threaded to the backend call

pub mod retries;
pub mod timeouts;

pub use retries::RetryPolicy;
pub use timeouts::call_with_deadline;
