//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate path pattern, bind captures)
//!     → Return: matched Route + params, or NoMatch
//!
//! Route Compilation (at startup):
//!     built-in bridge routes + configured proxy routes
//!     → Parse patterns, check duplicates and parameters
//!     → Sort by specificity
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by specificity)

pub mod matcher;
pub mod router;

pub use matcher::{PathPattern, RouteParams};
pub use router::{ProxyTarget, Route, RouteDefinition, RouteMatch, RouteTable, RouteTarget};
