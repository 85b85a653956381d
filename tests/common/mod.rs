//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_gateway::config::{ClusterConfig, ConfigError, DestinationConfig, GatewayConfig, RouteConfig};
use api_gateway::upstream::proto::*;
use api_gateway::upstream::{AuthService, ImageService, LoggerService, MailService, Services};
use api_gateway::{GatewayError, HttpServer, Shutdown};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// First line and headers of a request received by a mock backend.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let text = String::from_utf8_lossy(&buf).to_string();
    let head = text.split("\r\n\r\n").next().unwrap_or_default();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    Some(SeenRequest { request_line, headers })
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives what the backend saw and returns (status, body).
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(seen) = read_head(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(seen).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock backend that answers `name` and counts its requests.
pub async fn start_counting_backend(name: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let addr = start_programmable_backend(move |_| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            (200, name.to_string())
        }
    })
    .await;
    (addr, hits)
}

/// An address nothing listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Sets `dropped` unless the call ran to completion.
struct CompletionFlag<'a> {
    dropped: &'a AtomicUsize,
    done: bool,
}

impl Drop for CompletionFlag<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// In-process stand-in for all four backends.
#[derive(Default)]
pub struct StubBackends {
    pub calls: AtomicUsize,
    pub completed: AtomicUsize,
    pub dropped: AtomicUsize,
    delay_ms: AtomicU64,
    failure: Mutex<Option<(tonic::Code, String)>>,
    pub uploads: Mutex<Vec<UploadRequest>>,
}

impl StubBackends {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn services(self: &Arc<Self>) -> Services {
        Services {
            auth: self.clone(),
            logger: self.clone(),
            mail: self.clone(),
            image: self.clone(),
        }
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail_with(&self, code: tonic::Code, message: &str) {
        *self.failure.lock().unwrap() = Some((code, message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn serve<T>(&self, backend: &str, reply: T) -> Result<T, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut flag = CompletionFlag {
            dropped: &self.dropped,
            done: false,
        };

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        flag.done = true;
        self.completed.fetch_add(1, Ordering::SeqCst);

        let failure = self.failure.lock().unwrap().clone();
        match failure {
            Some((code, message)) => Err(GatewayError::Backend {
                backend: backend.to_string(),
                code,
                message,
            }),
            None => Ok(reply),
        }
    }
}

#[async_trait]
impl AuthService for StubBackends {
    async fn sign_up(&self, req: SignUpRequest) -> Result<SignUpResponse, GatewayError> {
        let reply = SignUpResponse {
            user_id: format!("user-{}", req.email),
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            message: "Registration successful".into(),
        };
        self.serve("auth", reply).await
    }

    async fn sign_in(&self, req: SignInRequest) -> Result<SignInResponse, GatewayError> {
        let reply = SignInResponse {
            access_token: format!("access-{}", req.user_name),
            refresh_token: format!("refresh-{}", req.user_name),
            expires_in: 3600,
            user_id: format!("id-{}", req.user_name),
            user_name: req.user_name,
        };
        self.serve("auth", reply).await
    }

    async fn verify_mail(&self, req: VerifyMailRequest) -> Result<VerifyMailResponse, GatewayError> {
        let reply = VerifyMailResponse {
            message: format!("verified {}", req.otp),
            user_id: req.verification_otp_code,
        };
        self.serve("auth", reply).await
    }

    async fn resend_otp(&self, req: ResendOtpRequest) -> Result<ResendOtpResponse, GatewayError> {
        let reply = ResendOtpResponse {
            message: "OTP resent".into(),
            verification_token: req.verification_otp_code,
        };
        self.serve("auth", reply).await
    }

    async fn verify_access_token(
        &self,
        req: VerifyAccessTokenRequest,
    ) -> Result<VerifyAccessTokenResponse, GatewayError> {
        let reply = VerifyAccessTokenResponse {
            valid: !req.token.is_empty(),
            message: format!("token={}", req.token),
        };
        self.serve("auth", reply).await
    }

    async fn renew_access_token(
        &self,
        req: RenewAccessTokenRequest,
    ) -> Result<RenewAccessTokenResponse, GatewayError> {
        let reply = RenewAccessTokenResponse {
            access_token: format!("renewed-{}", req.vrto),
            refresh_token: req.vrto,
            expires_in: 60,
        };
        self.serve("auth", reply).await
    }

    async fn get_provinces(&self, _req: GetProvincesRequest) -> Result<GetProvincesResponse, GatewayError> {
        let reply = GetProvincesResponse {
            provinces: vec![City {
                id: 1,
                code: "01".into(),
                name: "Ha Noi".into(),
                r#type: "province".into(),
                province_code: String::new(),
                parent_code: String::new(),
            }],
        };
        self.serve("auth", reply).await
    }

    async fn get_wards(&self, req: GetWardsRequest) -> Result<GetWardsResponse, GatewayError> {
        let reply = GetWardsResponse {
            wards: vec![City {
                id: 7,
                code: "00007".into(),
                name: "Phuc Xa".into(),
                r#type: "ward".into(),
                province_code: req.province_code.clone(),
                parent_code: req.province_code,
            }],
        };
        self.serve("auth", reply).await
    }
}

#[async_trait]
impl LoggerService for StubBackends {
    async fn log_info(&self, req: LogRequest) -> Result<LogResponse, GatewayError> {
        let reply = LogResponse {
            message: format!("logged {}", req.name),
        };
        self.serve("logger", reply).await
    }
}

#[async_trait]
impl MailService for StubBackends {
    async fn send_mail(&self, req: MailRequest) -> Result<MailResponse, GatewayError> {
        let reply = MailResponse {
            message: format!("sent to {} with {} attachment(s)", req.to, req.attachments.len()),
        };
        self.serve("mail", reply).await
    }
}

#[async_trait]
impl ImageService for StubBackends {
    async fn upload_to_folder(&self, req: UploadRequest) -> Result<UploadResponse, GatewayError> {
        let path = format!("{}/{}", req.folder, req.file_name);
        self.uploads.lock().unwrap().push(req);
        let reply = UploadResponse {
            url: format!("https://cdn.example.com/{path}"),
            path,
            message: "uploaded".into(),
        };
        self.serve("image", reply).await
    }
}

/// Add a cluster of HTTP destinations and a catch-all proxy route under `prefix`.
pub fn add_proxy_route(config: &mut GatewayConfig, cluster: &str, prefix: &str, destinations: &[SocketAddr]) {
    config.clusters.push(ClusterConfig {
        id: cluster.to_string(),
        destinations: destinations
            .iter()
            .enumerate()
            .map(|(i, addr)| DestinationConfig {
                name: format!("{cluster}-{i}"),
                address: format!("http://{addr}"),
                weight: 1,
            })
            .collect(),
    });
    config.routes.push(RouteConfig {
        name: cluster.to_string(),
        methods: vec![],
        path: format!("{prefix}/{{**rest}}"),
        cluster: cluster.to_string(),
        strip_prefix: Some(prefix.to_string()),
        timeout_ms: Some(2_000),
    });
}

/// A running gateway.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the gateway over `services` on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig, services: Services) -> TestGateway {
    serve_gateway(config, |config| HttpServer::with_services(config, services)).await
}

/// Start the gateway with its gRPC clients dialing the configured backends.
pub async fn start_grpc_gateway(config: GatewayConfig) -> TestGateway {
    serve_gateway(config, HttpServer::new).await
}

async fn serve_gateway(
    mut config: GatewayConfig,
    build: impl FnOnce(GatewayConfig) -> Result<HttpServer, ConfigError>,
) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();
    config.health.active_enabled = false;

    let server = build(config).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway { addr, shutdown }
}

/// Client without connection pooling or system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
