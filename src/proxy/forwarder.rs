//! Request forwarding to proxy clusters.
//!
//! # Responsibilities
//! - Select a destination from the route's cluster
//! - Rewrite the URI (destination base path, strip prefix, original query)
//! - Rewrite headers for forwarding
//! - Stream the upstream response back
//!
//! # Design Decisions
//! - Only connect failures are retried, and only for idempotent methods
//! - Idempotent bodies are buffered (bounded) so the retry can replay them
//! - The route timeout covers the wait for response headers, not the body stream

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{Request, Response, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::GatewayError;
use crate::health::passive::{self, AttemptOutcome};
use crate::http::request::InboundRequest;
use crate::http::response::OutboundResult;
use crate::resilience::RetryPolicy;
use crate::routing::ProxyTarget;
use crate::security::{headers, limits};
use crate::upstream::BackendRegistry;

/// Request body for one or more attempts.
enum ReplayBody {
    Buffered(Bytes),
    Streaming(Option<Body>),
}

impl ReplayBody {
    fn next(&mut self) -> Body {
        match self {
            ReplayBody::Buffered(bytes) => Body::from(bytes.clone()),
            ReplayBody::Streaming(body) => body.take().unwrap_or_else(Body::empty),
        }
    }
}

enum AttemptError {
    Cancelled,
    TimedOut,
    Transport(hyper_util::client::legacy::Error),
}

/// Forwards requests to cluster destinations.
pub struct ProxyForwarder {
    registry: Arc<BackendRegistry>,
    client: Client<HttpConnector, Body>,
    retry: RetryPolicy,
    replay_limit: usize,
}

impl ProxyForwarder {
    /// `replay_limit` bounds the buffered body of retryable requests.
    pub fn new(registry: Arc<BackendRegistry>, dial_timeout: Duration, replay_limit: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(dial_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            registry,
            client,
            retry: RetryPolicy::default(),
            replay_limit,
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Forward `request` to a destination of `target.cluster`.
    pub async fn forward(
        &self,
        target: &ProxyTarget,
        timeout: Duration,
        request: InboundRequest,
        cancel: &CancellationToken,
    ) -> Result<OutboundResult, GatewayError> {
        let cluster = self.registry.cluster(&target.cluster).ok_or_else(|| {
            GatewayError::Internal(format!("route targets unknown cluster '{}'", target.cluster))
        })?;

        let request_id = request.request_id().to_string();
        let InboundRequest {
            method,
            uri,
            headers: inbound_headers,
            body,
            client_addr,
            ..
        } = request;

        let max_attempts = self.retry.attempts_for(&method);
        let mut body = if max_attempts > 1 {
            limits::check_content_length(&inbound_headers, self.replay_limit)?;
            ReplayBody::Buffered(limits::read_bounded(body, self.replay_limit).await?)
        } else {
            ReplayBody::Streaming(Some(body))
        };

        let forward_path = rewrite_path(uri.path(), target.strip_prefix.as_deref());
        let mut tried: Vec<usize> = Vec::with_capacity(max_attempts);
        let mut last_error = String::from("no attempt made");

        while tried.len() < max_attempts {
            let Some((index, destination)) = cluster.select(&tried) else {
                if tried.is_empty() {
                    tracing::warn!(request_id = %request_id, cluster = %cluster.id(), "No eligible destination");
                    return Err(GatewayError::ClusterUnavailable {
                        cluster: cluster.id().to_string(),
                    });
                }
                break;
            };
            tried.push(index);
            let attempt = tried.len();
            let _in_flight = destination.guard();

            let upstream_uri = destination_uri(&destination.descriptor.address, &forward_path, uri.query())?;
            let authority = upstream_uri
                .authority()
                .map(|a| a.to_string())
                .unwrap_or_default();

            let mut upstream_headers = inbound_headers.clone();
            headers::prepare_forward_headers(&mut upstream_headers, client_addr, &authority);

            let mut upstream = Request::new(body.next());
            *upstream.method_mut() = method.clone();
            *upstream.uri_mut() = upstream_uri;
            *upstream.headers_mut() = upstream_headers;

            tracing::debug!(
                request_id = %request_id,
                cluster = %cluster.id(),
                destination = %destination.descriptor.id,
                attempt,
                uri = %upstream.uri(),
                "Forwarding request"
            );

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(AttemptError::Cancelled),
                result = tokio::time::timeout(timeout, self.client.request(upstream)) => match result {
                    Ok(Ok(response)) => Ok(response),
                    Ok(Err(e)) => Err(AttemptError::Transport(e)),
                    Err(_) => Err(AttemptError::TimedOut),
                },
            };

            match result {
                Ok(response) => {
                    passive::observe(&destination, AttemptOutcome::Response(response.status()));
                    let (mut parts, body) = response.into_parts();
                    headers::strip_hop_by_hop(&mut parts.headers);
                    return Ok(Response::from_parts(parts, Body::new(body)));
                }
                Err(AttemptError::Cancelled) => {
                    passive::observe(&destination, AttemptOutcome::Cancelled);
                    tracing::debug!(request_id = %request_id, "Proxy request cancelled by client");
                    return Err(GatewayError::Cancelled);
                }
                Err(AttemptError::TimedOut) => {
                    passive::observe(&destination, AttemptOutcome::Timeout);
                    tracing::warn!(
                        request_id = %request_id,
                        destination = %destination.descriptor.id,
                        timeout_ms = timeout.as_millis() as u64,
                        "Upstream timed out"
                    );
                    return Err(GatewayError::BackendTimeout {
                        backend: destination.descriptor.id.clone(),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                Err(AttemptError::Transport(e)) => {
                    passive::observe(&destination, AttemptOutcome::ConnectError);
                    last_error = e.to_string();
                    tracing::error!(
                        request_id = %request_id,
                        destination = %destination.descriptor.id,
                        attempt,
                        error = %e,
                        "Upstream error"
                    );
                    // The request may have reached the destination; replaying it is unsafe.
                    if !e.is_connect() {
                        break;
                    }
                }
            }
        }

        Err(GatewayError::ProxyForward {
            cluster: cluster.id().to_string(),
            attempts: tried.len(),
            reason: last_error,
        })
    }
}

/// Request path with `strip_prefix` removed (ASCII case-insensitive).
fn rewrite_path(path: &str, strip_prefix: Option<&str>) -> String {
    let remainder = match strip_prefix {
        Some(prefix) => match path.get(..prefix.len()) {
            Some(head) if head.eq_ignore_ascii_case(prefix) => &path[prefix.len()..],
            _ => path,
        },
        None => path,
    };

    if remainder.starts_with('/') {
        remainder.to_string()
    } else {
        format!("/{remainder}")
    }
}

/// Destination base URL path joined with the forwarded path and query.
fn destination_uri(base: &Url, path: &str, query: Option<&str>) -> Result<Uri, GatewayError> {
    let mut url = base.clone();
    let joined = format!("{}{}", base.path().trim_end_matches('/'), path);
    url.set_path(&joined);
    url.set_query(query);

    Uri::try_from(url.as_str())
        .map_err(|e| GatewayError::Internal(format!("invalid upstream uri '{url}': {e}")))
}
