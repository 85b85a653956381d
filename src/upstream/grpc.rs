//! gRPC transport for the typed backends.
//!
//! # Responsibilities
//! - Dial h2c channels with tonic
//! - Issue generic unary calls over pooled channels
//! - Translate gRPC statuses into [`GatewayError`]s

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};

use crate::error::GatewayError;
use crate::upstream::pool::{ConnectionHandle, ConnectionPool, DialError, Dialer};
use crate::upstream::registry::{BackendDescriptor, BackendKind};

const HTTP2_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const HTTP2_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pool of tonic channels.
pub type GrpcPool = ConnectionPool<GrpcDialer>;

/// Dials cleartext HTTP/2 channels.
#[derive(Debug, Clone)]
pub struct GrpcDialer {
    connect_timeout: Duration,
}

impl GrpcDialer {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Dialer for GrpcDialer {
    type Channel = Channel;

    async fn dial(&self, backend: &BackendDescriptor) -> Result<Channel, DialError> {
        let endpoint = Endpoint::from_shared(backend.address.to_string())
            .map_err(|e| DialError(error_chain(&e)))?
            .connect_timeout(self.connect_timeout)
            .tcp_nodelay(true)
            .http2_keep_alive_interval(HTTP2_KEEPALIVE_INTERVAL)
            .keep_alive_timeout(HTTP2_KEEPALIVE_TIMEOUT)
            .keep_alive_while_idle(true);

        endpoint.connect().await.map_err(|e| DialError(error_chain(&e)))
    }
}

/// Unary caller bound to one backend.
#[derive(Clone)]
pub struct RpcClient {
    pool: Arc<GrpcPool>,
    backend: BackendKind,
}

impl RpcClient {
    pub fn new(pool: Arc<GrpcPool>, backend: BackendKind) -> Self {
        Self { pool, backend }
    }

    /// Send `request` to the method at `path` and wait for the reply.
    pub async fn unary<Req, Resp>(&self, path: &'static str, request: Req) -> Result<Resp, GatewayError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let handle = self.pool.get_connection(self.backend).await?;
        let mut grpc = tonic::client::Grpc::new(handle.channel());

        if let Err(e) = grpc.ready().await {
            self.pool.mark_broken(&handle);
            return Err(GatewayError::BackendUnavailable {
                backend: self.backend.to_string(),
                reason: error_chain(&e),
            });
        }

        let codec = tonic::codec::ProstCodec::<Req, Resp>::default();
        let path = PathAndQuery::from_static(path);

        match grpc.unary(tonic::Request::new(request), path, codec).await {
            Ok(response) => Ok(response.into_inner()),
            Err(status) => Err(self.status_to_error(&handle, status)),
        }
    }

    fn status_to_error(&self, handle: &ConnectionHandle<Channel>, status: Status) -> GatewayError {
        match status.code() {
            Code::Unavailable => {
                self.pool.mark_broken(handle);
                GatewayError::BackendUnavailable {
                    backend: self.backend.to_string(),
                    reason: status.message().to_string(),
                }
            }
            code => GatewayError::Backend {
                backend: self.backend.to_string(),
                code,
                message: status.message().to_string(),
            },
        }
    }
}

/// Render an error with its source chain; tonic's top-level messages are terse.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
