//! Response construction.
//!
//! # Responsibilities
//! - Render successful bridge replies as JSON
//! - Render every [`GatewayError`] as `{error, code}` with its status
//!
//! # Design Decisions
//! - Error bodies carry only the public message; detail stays in logs
//! - Proxied responses are streamed, never buffered here

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// What the dispatcher hands back to the HTTP layer.
pub type OutboundResult = Response<Body>;

/// Structured error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl From<&GatewayError> for ErrorBody {
    fn from(err: &GatewayError) -> Self {
        Self {
            error: err.public_message(),
            code: err.code(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody::from(&self);
        (self.status_code(), axum::Json(body)).into_response()
    }
}

/// `200 OK` with `value` serialized as JSON.
pub fn json_ok<T: Serialize>(value: &T) -> Result<OutboundResult, GatewayError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| GatewayError::Internal(format!("failed to serialize reply: {e}")))?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}
