//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, gateway handler)
//!     → request.rs (request ID, transport-neutral InboundRequest)
//!     → [dispatcher: bridge adapter or proxy forwarder]
//!     → response.rs (JSON replies, structured error bodies)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundRequest, X_REQUEST_ID};
pub use response::{ErrorBody, OutboundResult};
pub use server::HttpServer;
