//! Typed service clients.
//!
//! One trait per backend keeps the bridge adapters independent of the
//! transport: production wires the tonic clients below, tests plug in stubs.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::upstream::grpc::{GrpcPool, RpcClient};
use crate::upstream::proto::*;
use crate::upstream::registry::BackendKind;

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_up(&self, req: SignUpRequest) -> Result<SignUpResponse, GatewayError>;
    async fn sign_in(&self, req: SignInRequest) -> Result<SignInResponse, GatewayError>;
    async fn verify_mail(&self, req: VerifyMailRequest) -> Result<VerifyMailResponse, GatewayError>;
    async fn resend_otp(&self, req: ResendOtpRequest) -> Result<ResendOtpResponse, GatewayError>;
    async fn verify_access_token(
        &self,
        req: VerifyAccessTokenRequest,
    ) -> Result<VerifyAccessTokenResponse, GatewayError>;
    async fn renew_access_token(
        &self,
        req: RenewAccessTokenRequest,
    ) -> Result<RenewAccessTokenResponse, GatewayError>;
    async fn get_provinces(&self, req: GetProvincesRequest) -> Result<GetProvincesResponse, GatewayError>;
    async fn get_wards(&self, req: GetWardsRequest) -> Result<GetWardsResponse, GatewayError>;
}

#[async_trait]
pub trait LoggerService: Send + Sync {
    async fn log_info(&self, req: LogRequest) -> Result<LogResponse, GatewayError>;
}

#[async_trait]
pub trait MailService: Send + Sync {
    async fn send_mail(&self, req: MailRequest) -> Result<MailResponse, GatewayError>;
}

#[async_trait]
pub trait ImageService: Send + Sync {
    async fn upload_to_folder(&self, req: UploadRequest) -> Result<UploadResponse, GatewayError>;
}

/// The four backend clients, as used by the bridge adapters.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn AuthService>,
    pub logger: Arc<dyn LoggerService>,
    pub mail: Arc<dyn MailService>,
    pub image: Arc<dyn ImageService>,
}

impl Services {
    /// gRPC-backed clients sharing one connection pool.
    pub fn grpc(pool: Arc<GrpcPool>) -> Self {
        Self {
            auth: Arc::new(GrpcAuthClient(RpcClient::new(pool.clone(), BackendKind::Auth))),
            logger: Arc::new(GrpcLoggerClient(RpcClient::new(pool.clone(), BackendKind::Logger))),
            mail: Arc::new(GrpcMailClient(RpcClient::new(pool.clone(), BackendKind::Mail))),
            image: Arc::new(GrpcImageClient(RpcClient::new(pool, BackendKind::Image))),
        }
    }
}

struct GrpcAuthClient(RpcClient);

#[async_trait]
impl AuthService for GrpcAuthClient {
    async fn sign_up(&self, req: SignUpRequest) -> Result<SignUpResponse, GatewayError> {
        self.0.unary("/auth.AuthService/SignUp", req).await
    }

    async fn sign_in(&self, req: SignInRequest) -> Result<SignInResponse, GatewayError> {
        self.0.unary("/auth.AuthService/SignIn", req).await
    }

    async fn verify_mail(&self, req: VerifyMailRequest) -> Result<VerifyMailResponse, GatewayError> {
        self.0.unary("/auth.AuthService/VerifyMail", req).await
    }

    async fn resend_otp(&self, req: ResendOtpRequest) -> Result<ResendOtpResponse, GatewayError> {
        self.0.unary("/auth.AuthService/ResendOTP", req).await
    }

    async fn verify_access_token(
        &self,
        req: VerifyAccessTokenRequest,
    ) -> Result<VerifyAccessTokenResponse, GatewayError> {
        self.0.unary("/auth.AuthService/VerifyAccessToken", req).await
    }

    async fn renew_access_token(
        &self,
        req: RenewAccessTokenRequest,
    ) -> Result<RenewAccessTokenResponse, GatewayError> {
        self.0.unary("/auth.AuthService/RenewAccessToken", req).await
    }

    async fn get_provinces(&self, req: GetProvincesRequest) -> Result<GetProvincesResponse, GatewayError> {
        self.0.unary("/auth.AuthService/GetProvinces", req).await
    }

    async fn get_wards(&self, req: GetWardsRequest) -> Result<GetWardsResponse, GatewayError> {
        self.0.unary("/auth.AuthService/GetWards", req).await
    }
}

struct GrpcLoggerClient(RpcClient);

#[async_trait]
impl LoggerService for GrpcLoggerClient {
    async fn log_info(&self, req: LogRequest) -> Result<LogResponse, GatewayError> {
        self.0.unary("/logger.LoggerService/LogInfo", req).await
    }
}

struct GrpcMailClient(RpcClient);

#[async_trait]
impl MailService for GrpcMailClient {
    async fn send_mail(&self, req: MailRequest) -> Result<MailResponse, GatewayError> {
        self.0.unary("/mail.MailService/SendMail", req).await
    }
}

struct GrpcImageClient(RpcClient);

#[async_trait]
impl ImageService for GrpcImageClient {
    async fn upload_to_folder(&self, req: UploadRequest) -> Result<UploadResponse, GatewayError> {
        self.0.unary("/image.ImageService/UploadToFolder", req).await
    }
}
