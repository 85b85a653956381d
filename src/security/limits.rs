//! Request body limits.
//!
//! # Responsibilities
//! - Reject declared Content-Length above the limit before reading
//! - Enforce the limit again while reading (chunked or lying clients)
//!
//! # Design Decisions
//! - Limits checked before full parsing (early rejection)
//! - Limits are per route family (JSON bodies, uploads, replayable proxy bodies)
//! - Return 413 Payload Too Large

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap};
use futures_util::StreamExt;

use crate::error::GatewayError;

/// Fail if the declared `Content-Length` exceeds `limit`.
pub fn check_content_length(headers: &HeaderMap, limit: usize) -> Result<(), GatewayError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    match declared {
        Some(len) if len > limit as u64 => Err(GatewayError::PayloadTooLarge { limit }),
        _ => Ok(()),
    }
}

/// Read the whole body, failing once more than `limit` bytes arrive.
pub async fn read_bounded(body: Body, limit: usize) -> Result<Bytes, GatewayError> {
    let mut stream = body.into_data_stream();
    let mut buf: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::debug!(error = %e, "Failed to read request body");
            GatewayError::translation("Failed to read request body")
        })?;
        if buf.len() + chunk.len() > limit {
            return Err(GatewayError::PayloadTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_declared_length() {
        let mut headers = HeaderMap::new();
        assert!(check_content_length(&headers, 10).is_ok());

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("10"));
        assert!(check_content_length(&headers, 10).is_ok());

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("11"));
        assert!(matches!(
            check_content_length(&headers, 10),
            Err(GatewayError::PayloadTooLarge { limit: 10 })
        ));
    }

    #[tokio::test]
    async fn test_read_bounded() {
        let bytes = read_bounded(Body::from("hello"), 5).await.unwrap();
        assert_eq!(&bytes[..], b"hello");

        let err = read_bounded(Body::from("hello!"), 5).await.unwrap_err();
        assert!(matches!(err, GatewayError::PayloadTooLarge { limit: 5 }));
    }
}
