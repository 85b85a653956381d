//! Reverse-proxy fallback.
//!
//! # Data Flow
//! ```text
//! Dispatcher (proxy route matched)
//!     → forwarder.rs:
//!         cluster lookup → destination selection (weighted round-robin)
//!         → URI rewrite + forwarding headers
//!         → request under the route timeout (to response headers)
//!         → passive health update
//!         → connect failure on GET/HEAD: one retry on another destination
//!     → streamed response
//! ```

pub mod forwarder;

pub use forwarder::ProxyForwarder;
