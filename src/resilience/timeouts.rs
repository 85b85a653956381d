//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls with the route timeout
//! - Abort the call when the client cancels
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the backend future is dropped on expiry,
//!   which cancels the RPC stream without touching the shared connection
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tonic::Code;

use crate::error::GatewayError;

/// Run `call` against `backend`, bounded by `timeout` and by `cancel`.
///
/// A backend-reported `DeadlineExceeded` is surfaced as [`GatewayError::BackendTimeout`]
/// like a local expiry.
pub async fn call_with_deadline<T, F>(
    backend: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    call: F,
) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    let timed_out = || GatewayError::BackendTimeout {
        backend: backend.to_string(),
        timeout_ms: timeout.as_millis() as u64,
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(backend = %backend, "Backend call cancelled by client");
            Err(GatewayError::Cancelled)
        }
        result = tokio::time::timeout(timeout, call) => match result {
            Ok(Err(GatewayError::Backend { code: Code::DeadlineExceeded, .. })) => Err(timed_out()),
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(backend = %backend, timeout_ms = timeout.as_millis() as u64, "Backend call timed out");
                Err(timed_out())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let token = CancellationToken::new();
        let out = call_with_deadline("auth", Duration::from_secs(1), &token, async { Ok::<_, GatewayError>(7) }).await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_backend_timeout() {
        let token = CancellationToken::new();
        let err = call_with_deadline("mail", Duration::from_millis(20), &token, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, GatewayError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, GatewayError::BackendTimeout { timeout_ms: 20, .. }));
    }

    #[tokio::test]
    async fn test_backend_deadline_exceeded_maps_to_timeout() {
        let token = CancellationToken::new();
        let err = call_with_deadline("auth", Duration::from_secs(1), &token, async {
            Err::<(), _>(GatewayError::Backend {
                backend: "auth".into(),
                code: Code::DeadlineExceeded,
                message: "deadline".into(),
            })
        })
        .await
        .unwrap_err();
        assert_eq!(err.status_code().as_u16(), 504);
        assert!(matches!(err, GatewayError::BackendTimeout { .. }));
    }

    #[tokio::test]
    async fn test_cancel_drops_the_call() {
        let token = CancellationToken::new();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = call_with_deadline("image", Duration::from_secs(5), &token, async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            flag.store(true, Ordering::SeqCst);
            Ok::<_, GatewayError>(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, GatewayError::Cancelled));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
