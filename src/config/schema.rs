//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Typed RPC backends reached through bridge routes.
    pub backends: BackendsConfig,

    /// Bridge translation settings (timeouts, body limits).
    pub bridge: BridgeConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Proxy clusters (named sets of interchangeable destinations).
    pub clusters: Vec<ClusterConfig>,

    /// Proxy route definitions mapping requests to clusters.
    pub routes: Vec<RouteConfig>,

    /// Destination health settings.
    pub health: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Address of every typed backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendsConfig {
    pub auth: BackendConfig,
    pub logger: BackendConfig,
    pub mail: BackendConfig,
    pub image: BackendConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            auth: BackendConfig::new("http://auth:50000"),
            logger: BackendConfig::new("http://logger-service:50001"),
            mail: BackendConfig::new("http://mail-service:50002"),
            image: BackendConfig::new("http://image-service:50003"),
        }
    }
}

/// A single gRPC backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend URL (e.g., "http://auth:50000"). Only `http` (h2c) is supported.
    pub url: String,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Bridge route settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Timeout applied to a backend call when the route has no override.
    pub default_timeout_ms: u64,

    /// Per-route timeout overrides keyed by route name (e.g. "Auth_SignIn").
    pub route_timeouts_ms: HashMap<String, u64>,

    /// Maximum accepted size of an uploaded file.
    pub max_upload_bytes: usize,

    /// Maximum accepted size of a JSON request body.
    pub max_json_body_bytes: usize,
}

impl BridgeConfig {
    /// Resolve the call timeout for a bridge route.
    pub fn timeout_for(&self, route: &str) -> Duration {
        let ms = self
            .route_timeouts_ms
            .get(route)
            .copied()
            .unwrap_or(self.default_timeout_ms);
        Duration::from_millis(ms)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 10_000,
            route_timeouts_ms: HashMap::new(),
            max_upload_bytes: 10 * 1024 * 1024, // 10MB
            max_json_body_bytes: 1024 * 1024,   // 1MB
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend dial timeout in milliseconds (gRPC connect and proxy connect).
    pub dial_ms: u64,

    /// Outer ceiling for a whole request in seconds.
    pub request_secs: u64,

    /// Time-to-response-headers for proxy routes without an override.
    pub proxy_default_ms: u64,
}

impl TimeoutConfig {
    pub fn dial(&self) -> Duration {
        Duration::from_millis(self.dial_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            dial_ms: 5_000,
            request_secs: 60,
            proxy_default_ms: 30_000,
        }
    }
}

/// A named set of interchangeable proxy destinations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterConfig {
    /// Cluster identifier referenced by routes.
    pub id: String,

    /// Destinations in rotation order.
    pub destinations: Vec<DestinationConfig>,
}

/// A proxy destination.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DestinationConfig {
    /// Destination identifier for logging/metrics.
    pub name: String,

    /// Base URL (e.g., "http://10.0.0.5:8080/").
    pub address: String,

    /// Consecutive turns this destination receives before rotation continues.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Proxy route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Accepted methods; empty means any method.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Path pattern, e.g. "/api/v1/User/{**rest}".
    pub path: String,

    /// Cluster to forward to.
    pub cluster: String,

    /// Literal prefix removed from the path before forwarding.
    #[serde(default)]
    pub strip_prefix: Option<String>,

    /// Time-to-response-headers override in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Destination health configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// How long a failed destination is skipped.
    pub cooldown_secs: u64,

    /// Enable active probing of proxy destinations.
    pub active_enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,

    /// Path to probe.
    pub path: String,
}

impl HealthCheckConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 30,
            active_enabled: false,
            interval_secs: 10,
            timeout_secs: 5,
            path: "/health".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
