//! Upstream backends.
//!
//! # Data Flow
//! ```text
//! Bridge adapter
//!     → services.rs (typed client trait)
//!     → grpc.rs (unary call, status mapping)
//!     → pool.rs (live channel for the backend, dial if needed)
//!     → registry.rs (backend address)
//! ```

pub mod grpc;
pub mod pool;
pub mod proto;
pub mod registry;
pub mod services;

pub use grpc::{GrpcDialer, GrpcPool, RpcClient};
pub use pool::{ConnectionHandle, ConnectionPool, ConnectionState, DialError, Dialer};
pub use registry::{BackendDescriptor, BackendKind, BackendRegistry, Protocol};
pub use services::{AuthService, ImageService, LoggerService, MailService, Services};
