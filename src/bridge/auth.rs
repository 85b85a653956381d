//! Auth bridge: account, token and city lookups.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Query;
use axum::http::Method;
use serde::Deserialize;

use crate::bridge::{read_json, BridgeAdapter, BridgeCall, RouteSpec};
use crate::error::GatewayError;
use crate::http::response::{json_ok, OutboundResult};
use crate::resilience::call_with_deadline;
use crate::upstream::proto::{
    GetProvincesRequest, GetWardsRequest, RenewAccessTokenRequest, ResendOtpRequest, SignInRequest,
    SignUpRequest, VerifyAccessTokenRequest, VerifyMailRequest,
};
use crate::upstream::{AuthService, BackendKind};

pub const SIGN_UP: &str = "Auth_SignUp";
pub const SIGN_IN: &str = "Auth_SignIn";
pub const VERIFY_MAIL: &str = "Auth_VerifyMail";
pub const RESEND_OTP: &str = "Auth_ResendOTP";
pub const VERIFY_ACCESS_TOKEN: &str = "Auth_VerifyAccessToken";
pub const RENEW_ACCESS_TOKEN: &str = "Auth_RenewAccessToken";
pub const GET_PROVINCES: &str = "Auth_GetProvinces";
pub const GET_WARDS: &str = "Auth_GetWards";

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

pub struct AuthAdapter {
    service: Arc<dyn AuthService>,
    max_body_bytes: usize,
}

impl AuthAdapter {
    pub fn new(service: Arc<dyn AuthService>, max_body_bytes: usize) -> Self {
        Self {
            service,
            max_body_bytes,
        }
    }
}

#[async_trait]
impl BridgeAdapter for AuthAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::Auth
    }

    fn routes(&self) -> Vec<RouteSpec> {
        vec![
            RouteSpec::new(SIGN_UP, Method::POST, "/api/v1/Auth/sign-up"),
            RouteSpec::new(SIGN_IN, Method::POST, "/api/v1/Auth/sign-in"),
            RouteSpec::new(VERIFY_MAIL, Method::POST, "/api/v1/Auth/verify-mail"),
            RouteSpec::new(RESEND_OTP, Method::POST, "/api/v1/Auth/resend-otp"),
            RouteSpec::new(VERIFY_ACCESS_TOKEN, Method::GET, "/api/v1/Auth/verify-access-token"),
            RouteSpec::new(RENEW_ACCESS_TOKEN, Method::POST, "/api/v1/Auth/renew-access-token"),
            RouteSpec::new(GET_PROVINCES, Method::GET, "/api/v1/Auth/cities/provinces"),
            RouteSpec::new(GET_WARDS, Method::GET, "/api/v1/Auth/cities/provinces/{province_code}/wards")
                .with_params(&["province_code"]),
        ]
    }

    async fn handle(&self, call: BridgeCall) -> Result<OutboundResult, GatewayError> {
        let BridgeCall {
            route,
            params,
            request,
            timeout,
            cancel,
        } = call;
        let backend = BackendKind::Auth.as_str();
        let service = &self.service;

        match route.as_str() {
            SIGN_UP => {
                let req: SignUpRequest = read_json(request, self.max_body_bytes).await?;
                json_ok(&call_with_deadline(backend, timeout, &cancel, service.sign_up(req)).await?)
            }
            SIGN_IN => {
                let req: SignInRequest = read_json(request, self.max_body_bytes).await?;
                json_ok(&call_with_deadline(backend, timeout, &cancel, service.sign_in(req)).await?)
            }
            VERIFY_MAIL => {
                let req: VerifyMailRequest = read_json(request, self.max_body_bytes).await?;
                json_ok(&call_with_deadline(backend, timeout, &cancel, service.verify_mail(req)).await?)
            }
            RESEND_OTP => {
                let req: ResendOtpRequest = read_json(request, self.max_body_bytes).await?;
                json_ok(&call_with_deadline(backend, timeout, &cancel, service.resend_otp(req)).await?)
            }
            VERIFY_ACCESS_TOKEN => {
                let Query(query) = Query::<TokenQuery>::try_from_uri(&request.uri)
                    .map_err(|rejection| GatewayError::translation(rejection.body_text()))?;
                let req = VerifyAccessTokenRequest {
                    token: query.token.unwrap_or_default(),
                };
                json_ok(&call_with_deadline(backend, timeout, &cancel, service.verify_access_token(req)).await?)
            }
            RENEW_ACCESS_TOKEN => {
                let req: RenewAccessTokenRequest = read_json(request, self.max_body_bytes).await?;
                json_ok(&call_with_deadline(backend, timeout, &cancel, service.renew_access_token(req)).await?)
            }
            GET_PROVINCES => {
                let req = GetProvincesRequest {};
                json_ok(&call_with_deadline(backend, timeout, &cancel, service.get_provinces(req)).await?)
            }
            GET_WARDS => {
                let province_code = params
                    .decoded("province_code")?
                    .ok_or_else(|| GatewayError::translation("province_code is required"))?;
                let req = GetWardsRequest { province_code };
                json_ok(&call_with_deadline(backend, timeout, &cancel, service.get_wards(req)).await?)
            }
            other => Err(GatewayError::Internal(format!("auth adapter has no route '{other}'"))),
        }
    }
}
