//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (declared Content-Length, bounded body reads)
//!     → [bridge translation or proxy forwarding]
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*) on proxied requests
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any limit breach
//! - No trust in client input; declared lengths are checked again while reading

pub mod headers;
pub mod limits;

pub use headers::{prepare_forward_headers, strip_hop_by_hop};
pub use limits::{check_content_length, read_bounded};
