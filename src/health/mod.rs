//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Passive health checks (passive.rs):
//!     Forwarding attempt finished
//!     → Classify outcome (connect error or timeout = failure, any response = success)
//!     → Update state.rs
//!
//! Active health checks (active.rs, optional):
//!     Periodic timer
//!     → Probe each destination
//!     → Non-2xx probe, connect error or timeout = failure
//!
//! State machine (state.rs):
//!     Healthy ←→ Unhealthy
//!     Unhealthy decays back to Healthy after the cooldown window
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary
//! - Health state is per-destination, not per-cluster

pub mod active;
pub mod passive;
pub mod state;

pub use active::HealthMonitor;
pub use passive::AttemptOutcome;
pub use state::{HealthMarker, HealthState};
