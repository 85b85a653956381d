//! Gateway error taxonomy.
//!
//! Every failure produced while dispatching a request is a [`GatewayError`].
//! The variant decides the client-visible status code and error code; the
//! `Display` text is for logs only and may carry internal detail.

use axum::http::StatusCode;
use thiserror::Error;
use tonic::Code;

/// Status used when the client went away before a response was produced.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Errors raised on the request path.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No route matches the method and path.
    #[error("no route matches {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// The HTTP request could not be translated into a backend call.
    #[error("invalid request: {0}")]
    Translation(String),

    /// The request body exceeds the configured limit.
    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Dialing or reaching the backend failed.
    #[error("backend {backend} unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    /// The backend did not answer within the route timeout.
    #[error("backend {backend} timed out after {timeout_ms}ms")]
    BackendTimeout { backend: String, timeout_ms: u64 },

    /// The backend explicitly reported a failure.
    #[error("backend {backend} reported {code:?}: {message}")]
    Backend {
        backend: String,
        code: Code,
        message: String,
    },

    /// A proxy cluster had no eligible destination to try.
    #[error("cluster {cluster} has no eligible destination")]
    ClusterUnavailable { cluster: String },

    /// Every attempted proxy destination failed.
    #[error("cluster {cluster} exhausted after {attempts} attempt(s): {reason}")]
    ProxyForward {
        cluster: String,
        attempts: usize,
        reason: String,
    },

    /// The client cancelled the request.
    #[error("request cancelled by client")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Shorthand for a translation failure.
    pub fn translation(message: impl Into<String>) -> Self {
        GatewayError::Translation(message.into())
    }

    /// HTTP status returned to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::Translation(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::BackendUnavailable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::BackendTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Backend { code, .. } => grpc_code_to_status(*code),
            GatewayError::ClusterUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::ProxyForward { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Cancelled => {
                StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST)
            }
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code rendered in the error body.
    pub fn code(&self) -> String {
        match self {
            GatewayError::RouteNotFound { .. } => "ROUTE_NOT_FOUND".into(),
            GatewayError::Translation(_) => "INVALID_REQUEST".into(),
            GatewayError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE".into(),
            GatewayError::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE".into(),
            GatewayError::BackendTimeout { .. } => "BACKEND_TIMEOUT".into(),
            GatewayError::Backend { code, .. } => format!("BACKEND_{}", grpc_code_name(*code)),
            GatewayError::ClusterUnavailable { .. } => "CLUSTER_UNAVAILABLE".into(),
            GatewayError::ProxyForward { .. } => "PROXY_FORWARD_FAILED".into(),
            GatewayError::Cancelled => "CLIENT_CLOSED_REQUEST".into(),
            GatewayError::Internal(_) => "INTERNAL_ERROR".into(),
        }
    }

    /// Message safe to show to clients. Transport and dial details stay in logs.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::RouteNotFound { .. } => "No matching route found".into(),
            GatewayError::Translation(msg) => msg.clone(),
            GatewayError::PayloadTooLarge { limit } => {
                format!("Payload exceeds the {limit} byte limit")
            }
            GatewayError::BackendUnavailable { backend, .. } => {
                format!("Backend '{backend}' is unavailable")
            }
            GatewayError::BackendTimeout { backend, .. } => {
                format!("Backend '{backend}' did not respond in time")
            }
            GatewayError::Backend { backend, code, message } => {
                if exposes_backend_message(*code) {
                    message.clone()
                } else {
                    format!("Backend '{backend}' failed to process the request")
                }
            }
            GatewayError::ClusterUnavailable { cluster } => {
                format!("No healthy destination in cluster '{cluster}'")
            }
            GatewayError::ProxyForward { .. } => "Upstream request failed".into(),
            GatewayError::Cancelled => "Request cancelled".into(),
            GatewayError::Internal(_) => "Internal server error".into(),
        }
    }
}

/// Explicit gRPC code → HTTP status table.
pub fn grpc_code_to_status(code: Code) -> StatusCode {
    match code {
        Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => {
            StatusCode::BAD_REQUEST
        }
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists | Code::Aborted => StatusCode::CONFLICT,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Codes whose status message is meant for the caller. Everything else
/// (`Unknown`, `Internal`, `DataLoss`, ...) may carry server internals.
fn exposes_backend_message(code: Code) -> bool {
    matches!(
        code,
        Code::InvalidArgument
            | Code::FailedPrecondition
            | Code::OutOfRange
            | Code::Unauthenticated
            | Code::PermissionDenied
            | Code::NotFound
            | Code::AlreadyExists
            | Code::ResourceExhausted
    )
}

fn grpc_code_name(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "CANCELLED",
        Code::Unknown => "UNKNOWN",
        Code::InvalidArgument => "INVALID_ARGUMENT",
        Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
        Code::NotFound => "NOT_FOUND",
        Code::AlreadyExists => "ALREADY_EXISTS",
        Code::PermissionDenied => "PERMISSION_DENIED",
        Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
        Code::FailedPrecondition => "FAILED_PRECONDITION",
        Code::Aborted => "ABORTED",
        Code::OutOfRange => "OUT_OF_RANGE",
        Code::Unimplemented => "UNIMPLEMENTED",
        Code::Internal => "INTERNAL",
        Code::Unavailable => "UNAVAILABLE",
        Code::DataLoss => "DATA_LOSS",
        Code::Unauthenticated => "UNAUTHENTICATED",
    }
}
