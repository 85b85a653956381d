//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble registry, connection pool, adapters, route table and dispatcher
//! - Create Axum Router with the gateway handler as fallback
//! - Wire up middleware (tracing, request ID, outer timeout)
//! - Bind server to listener and run until shutdown
//! - Run the active health monitor alongside the server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::{Method, Request},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::bridge::BridgeSet;
use crate::config::{ConfigError, GatewayConfig, ValidationError};
use crate::dispatcher::Dispatcher;
use crate::error::GatewayError;
use crate::health::HealthMonitor;
use crate::http::request::{InboundRequest, UuidRequestId, X_REQUEST_ID};
use crate::proxy::ProxyForwarder;
use crate::routing::{ProxyTarget, RouteDefinition, RouteTable, RouteTarget};
use crate::upstream::{BackendRegistry, GrpcDialer, GrpcPool, Services};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    monitor: HealthMonitor,
}

impl HttpServer {
    /// Build a server whose bridge adapters call the configured gRPC backends.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        let registry = BackendRegistry::from_config(&config)?;
        let dial_timeout = config.timeouts.dial();
        let pool = Arc::new(GrpcPool::new(&registry, GrpcDialer::new(dial_timeout), dial_timeout));

        Self::assemble(config, registry, Services::grpc(pool))
    }

    /// Build a server over caller-supplied backend services.
    pub fn with_services(config: GatewayConfig, services: Services) -> Result<Self, ConfigError> {
        let registry = BackendRegistry::from_config(&config)?;
        Self::assemble(config, registry, services)
    }

    fn assemble(config: GatewayConfig, registry: BackendRegistry, services: Services) -> Result<Self, ConfigError> {
        let bridges = BridgeSet::new(services, &config.bridge);

        let mut definitions = bridges.route_definitions(&config.bridge);
        definitions.extend(proxy_definitions(&config)?);
        let routes = RouteTable::compile(definitions)?;

        let registry = Arc::new(registry);
        let monitor = HealthMonitor::new(registry.clusters().cloned().collect(), config.health.clone());
        let forwarder = ProxyForwarder::new(registry, config.timeouts.dial(), config.bridge.max_json_body_bytes);

        let dispatcher = Arc::new(Dispatcher::new(routes, bridges, forwarder)?);
        let router = Self::build_router(&config, AppState { dispatcher });

        Ok(Self {
            router,
            config,
            monitor,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .fallback(gateway_handler)
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), UuidRequestId))
    }

    /// Run the server, accepting connections on the given listener until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let monitor_shutdown = shutdown.resubscribe();
        let monitor = self.monitor;
        tokio::spawn(async move {
            monitor.run(monitor_shutdown).await;
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Configured proxy routes as route definitions.
fn proxy_definitions(config: &GatewayConfig) -> Result<Vec<RouteDefinition>, ConfigError> {
    config
        .routes
        .iter()
        .map(|route| {
            let methods = route
                .methods
                .iter()
                .map(|m| {
                    Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes()).map_err(|_| {
                        ConfigError::Validation(vec![ValidationError {
                            field: format!("routes.{}.methods", route.name),
                            reason: format!("'{m}' is not an HTTP method"),
                        }])
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(RouteDefinition {
                name: route.name.clone(),
                methods,
                path: route.path.clone(),
                target: RouteTarget::Proxy(ProxyTarget {
                    cluster: route.cluster.clone(),
                    strip_prefix: route.strip_prefix.clone(),
                }),
                params: None,
                timeout: Duration::from_millis(route.timeout_ms.unwrap_or(config.timeouts.proxy_default_ms)),
            })
        })
        .collect()
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "service": "api-gateway" }))
}

/// Gateway handler: everything that is not `/health` goes through the dispatcher.
///
/// The dispatch runs in its own task; when the client disconnects this future is
/// dropped, the drop guard cancels the token and the in-flight backend call is abandoned.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let inbound = InboundRequest::new(request, client_addr);

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let dispatcher = state.dispatcher.clone();
    let task = tokio::spawn(async move { dispatcher.handle(inbound, cancel).await });

    match task.await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            GatewayError::Internal(e.to_string()).into_response()
        }
    }
}
