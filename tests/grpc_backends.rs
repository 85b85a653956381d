//! End-to-end tests through the pooled gRPC clients against in-process tonic backends.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use api_gateway::config::GatewayConfig;
use api_gateway::upstream::proto::{LogRequest, LogResponse, SignInRequest, SignInResponse};
use futures_util::future::join_all;
use futures_util::stream;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tonic::body::BoxBody;
use tonic::codec::ProstCodec;
use tonic::codegen::{empty_body, http, Body, BoxFuture, Service, StdError};
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::{Request, Response, Status};

mod common;

struct LogInfo;

impl UnaryService<LogRequest> for LogInfo {
    type Response = LogResponse;
    type Future = BoxFuture<Response<LogResponse>, Status>;

    fn call(&mut self, request: Request<LogRequest>) -> Self::Future {
        Box::pin(async move {
            let req = request.into_inner();
            if req.name == "unavailable" {
                return Err(Status::unavailable("draining"));
            }
            Ok(Response::new(LogResponse {
                message: format!("logged {} ({} bytes)", req.name, req.data.len()),
            }))
        })
    }
}

struct SignIn;

impl UnaryService<SignInRequest> for SignIn {
    type Response = SignInResponse;
    type Future = BoxFuture<Response<SignInResponse>, Status>;

    fn call(&mut self, request: Request<SignInRequest>) -> Self::Future {
        Box::pin(async move {
            let req = request.into_inner();
            if req.password != "pw" {
                return Err(Status::unauthenticated("Invalid username or password"));
            }
            Ok(Response::new(SignInResponse {
                access_token: format!("access-{}", req.user_name),
                refresh_token: format!("refresh-{}", req.user_name),
                expires_in: 3600,
                user_id: format!("id-{}", req.user_name),
                user_name: req.user_name,
            }))
        })
    }
}

/// `logger.LoggerService` with a single `LogInfo` method.
#[derive(Clone)]
struct LoggerBackend;

impl NamedService for LoggerBackend {
    const NAME: &'static str = "logger.LoggerService";
}

impl<B> Service<http::Request<B>> for LoggerBackend
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        match req.uri().path() {
            "/logger.LoggerService/LogInfo" => Box::pin(async move {
                let mut grpc = Grpc::new(ProstCodec::default());
                Ok(grpc.unary(LogInfo, req).await)
            }),
            _ => Box::pin(async move { Ok(unimplemented()) }),
        }
    }
}

/// `auth.AuthService` with only `SignIn` implemented.
#[derive(Clone)]
struct AuthBackend;

impl NamedService for AuthBackend {
    const NAME: &'static str = "auth.AuthService";
}

impl<B> Service<http::Request<B>> for AuthBackend
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        match req.uri().path() {
            "/auth.AuthService/SignIn" => Box::pin(async move {
                let mut grpc = Grpc::new(ProstCodec::default());
                Ok(grpc.unary(SignIn, req).await)
            }),
            _ => Box::pin(async move { Ok(unimplemented()) }),
        }
    }
}

fn unimplemented() -> http::Response<BoxBody> {
    let mut response = http::Response::new(empty_body());
    let headers = response.headers_mut();
    headers.insert(
        http::HeaderName::from_static("grpc-status"),
        http::HeaderValue::from(tonic::Code::Unimplemented as i32),
    );
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/grpc"),
    );
    response
}

/// Serve both backends on an ephemeral port, counting accepted connections.
async fn start_grpc_backends() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    let incoming = stream::unfold(listener, move |listener| {
        let counter = counter.clone();
        async move {
            let conn = listener.accept().await.map(|(stream, _)| {
                counter.fetch_add(1, Ordering::SeqCst);
                stream
            });
            Some((conn, listener))
        }
    });

    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(LoggerBackend)
            .add_service(AuthBackend)
            .serve_with_incoming(incoming)
            .await
            .unwrap();
    });

    (addr, accepted)
}

fn config_for(addr: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.backends.auth.url = format!("http://{addr}");
    config.backends.logger.url = format!("http://{addr}");
    config
}

#[tokio::test]
async fn test_bridge_routes_reach_grpc_backends() {
    let (addr, _) = start_grpc_backends().await;
    let gateway = common::start_grpc_gateway(config_for(addr)).await;
    let client = common::client();

    let res = client
        .post(gateway.url("/api/v1/Auth/sign-in"))
        .json(&json!({"userName": "alice", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "accessToken": "access-alice",
            "refreshToken": "refresh-alice",
            "expiresIn": 3600,
            "userId": "id-alice",
            "userName": "alice"
        })
    );

    let res = client
        .post(gateway.url("/api/v1/Auth/sign-in"))
        .json(&json!({"userName": "alice", "password": "wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({"error": "Invalid username or password", "code": "BACKEND_UNAUTHENTICATED"})
    );

    // Method the backend does not implement.
    let res = client
        .get(gateway.url("/api/v1/Auth/cities/provinces"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 501);

    let body: Value = client
        .post(gateway.url("/api/v1/Logger/log"))
        .json(&json!({"name": "audit", "data": "{\"k\":1}"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"message": "logged audit (7 bytes)"}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_share_one_connection() {
    let (addr, accepted) = start_grpc_backends().await;
    let gateway = common::start_grpc_gateway(config_for(addr)).await;
    let client = common::client();

    let requests = (0..100).map(|i| {
        let client = client.clone();
        let url = gateway.url("/api/v1/Logger/log");
        async move {
            let res = client
                .post(url)
                .json(&json!({"name": format!("req-{i}")}))
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), 200);
            let body: Value = res.json().await.unwrap();
            (i, body)
        }
    });

    for (i, body) in join_all(requests).await {
        assert_eq!(body["message"], format!("logged req-{i} (0 bytes)"));
    }
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unavailable_status_forces_redial() {
    let (addr, accepted) = start_grpc_backends().await;
    let gateway = common::start_grpc_gateway(config_for(addr)).await;
    let client = common::client();

    let res = client
        .post(gateway.url("/api/v1/Logger/log"))
        .json(&json!({"name": "first"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(accepted.load(Ordering::SeqCst), 1);

    let res = client
        .post(gateway.url("/api/v1/Logger/log"))
        .json(&json!({"name": "unavailable"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "BACKEND_UNAVAILABLE");

    let res = client
        .post(gateway.url("/api/v1/Logger/log"))
        .json(&json!({"name": "second"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}
