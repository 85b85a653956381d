//! Request handling.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Capture the inbound request in a transport-neutral shape
//! - Extract routing-relevant information (method, path, query)
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Extensions are kept so body-limit settings reach the extractors

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{Extensions, HeaderMap, HeaderName, Method, Request, Uri, Version};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Correlation header set on every request and echoed on every response.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// An HTTP request as seen by the dispatcher.
#[derive(Debug)]
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub extensions: Extensions,
    pub body: Body,
    pub client_addr: Option<SocketAddr>,
}

impl InboundRequest {
    pub fn new(request: Request<Body>, client_addr: Option<SocketAddr>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            extensions: parts.extensions,
            body,
            client_addr,
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Value of the `x-request-id` header, or `"unknown"`.
    pub fn request_id(&self) -> &str {
        self.headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }

    /// Rebuild an `http::Request`, e.g. to run an axum extractor.
    pub fn into_http(self) -> Request<Body> {
        let mut request = Request::new(self.body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers;
        *request.extensions_mut() = self.extensions;
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_and_round_trip() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/Auth/sign-in?x=1")
            .header("x-request-id", "req-1")
            .body(Body::empty())
            .unwrap();

        let inbound = InboundRequest::new(request, None);
        assert_eq!(inbound.path(), "/api/v1/Auth/sign-in");
        assert_eq!(inbound.request_id(), "req-1");

        let rebuilt = inbound.into_http();
        assert_eq!(rebuilt.method(), Method::POST);
        assert_eq!(rebuilt.uri().query(), Some("x=1"));
    }

    #[test]
    fn test_uuid_request_ids_are_unique() {
        let mut maker = UuidRequestId;
        let req = Request::new(());
        let a = maker.make_request_id(&req).unwrap();
        let b = maker.make_request_id(&req).unwrap();
        assert_ne!(a.header_value(), b.header_value());
    }
}
