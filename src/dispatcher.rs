//! Request dispatch.
//!
//! # Responsibilities
//! - Match the request against the route table
//! - Hand bridge routes to their adapter, proxy routes to the forwarder
//! - Render every failure as a structured error response
//! - Record per-route request metrics
//!
//! # Design Decisions
//! - Every route target is checked once at assembly; a dangling target is a startup error
//! - Errors never escape `handle`; the HTTP layer always gets a response

use std::time::Instant;

use axum::response::IntoResponse;
use tokio_util::sync::CancellationToken;

use crate::bridge::{BridgeCall, BridgeSet};
use crate::config::ConfigError;
use crate::error::GatewayError;
use crate::http::request::InboundRequest;
use crate::http::response::OutboundResult;
use crate::observability::metrics;
use crate::proxy::ProxyForwarder;
use crate::routing::{RouteMatch, RouteTable, RouteTarget};

pub struct Dispatcher {
    routes: RouteTable,
    bridges: BridgeSet,
    forwarder: ProxyForwarder,
}

impl Dispatcher {
    /// Assemble a dispatcher, failing if any route targets an unknown cluster
    /// or a backend without an adapter.
    pub fn new(routes: RouteTable, bridges: BridgeSet, forwarder: ProxyForwarder) -> Result<Self, ConfigError> {
        for route in routes.routes() {
            match &route.target {
                RouteTarget::Bridge { backend } if !bridges.contains(*backend) => {
                    return Err(ConfigError::UnknownTarget {
                        route: route.name.clone(),
                        kind: "bridge backend",
                        target: backend.to_string(),
                    });
                }
                RouteTarget::Proxy(target) if forwarder.registry().cluster(&target.cluster).is_none() => {
                    return Err(ConfigError::UnknownTarget {
                        route: route.name.clone(),
                        kind: "cluster",
                        target: target.cluster.clone(),
                    });
                }
                _ => {}
            }
        }

        tracing::info!(routes = routes.len(), "Dispatcher ready");
        Ok(Self {
            routes,
            bridges,
            forwarder,
        })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Serve one request. `cancel` fires when the client goes away.
    pub async fn handle(&self, request: InboundRequest, cancel: CancellationToken) -> OutboundResult {
        let start = Instant::now();
        let request_id = request.request_id().to_string();
        let method = request.method.clone();
        let path = request.path().to_string();

        let Some(RouteMatch { route, params }) = self.routes.match_route(&method, &path) else {
            tracing::warn!(request_id = %request_id, method = %method, path = %path, "No route matched");
            let response = GatewayError::RouteNotFound {
                method: method.to_string(),
                path,
            }
            .into_response();
            metrics::record_request("none", "none", response.status().as_u16(), start);
            return response;
        };

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            route = %route.name,
            kind = route.kind(),
            "Dispatching request"
        );

        let result = match &route.target {
            RouteTarget::Bridge { backend } => match self.bridges.get(*backend) {
                Some(adapter) => {
                    let call = BridgeCall {
                        route: route.name.clone(),
                        params,
                        request,
                        timeout: route.timeout,
                        cancel,
                    };
                    adapter.handle(call).await
                }
                None => Err(GatewayError::Internal(format!("no adapter for backend '{backend}'"))),
            },
            RouteTarget::Proxy(target) => self.forwarder.forward(target, route.timeout, request, &cancel).await,
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                let status = err.status_code();
                if status.is_server_error() {
                    tracing::warn!(request_id = %request_id, route = %route.name, status = %status, error = %err, "Request failed");
                } else {
                    tracing::debug!(request_id = %request_id, route = %route.name, status = %status, error = %err, "Request rejected");
                }
                err.into_response()
            }
        };

        metrics::record_request(&route.name, route.kind(), response.status().as_u16(), start);
        response
    }
}
