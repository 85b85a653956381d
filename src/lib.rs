//! HTTP API gateway: typed HTTP → gRPC bridges plus a reverse-proxy fallback.

pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
