//! Mail bridge.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;

use crate::bridge::{read_json, BridgeAdapter, BridgeCall, RouteSpec};
use crate::error::GatewayError;
use crate::http::response::{json_ok, OutboundResult};
use crate::resilience::call_with_deadline;
use crate::upstream::proto::MailRequest;
use crate::upstream::{BackendKind, MailService};

pub const SEND: &str = "Mail_Send";

pub struct MailAdapter {
    service: Arc<dyn MailService>,
    max_body_bytes: usize,
}

impl MailAdapter {
    pub fn new(service: Arc<dyn MailService>, max_body_bytes: usize) -> Self {
        Self {
            service,
            max_body_bytes,
        }
    }
}

#[async_trait]
impl BridgeAdapter for MailAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::Mail
    }

    fn routes(&self) -> Vec<RouteSpec> {
        vec![RouteSpec::new(SEND, Method::POST, "/api/v1/Mail/send")]
    }

    async fn handle(&self, call: BridgeCall) -> Result<OutboundResult, GatewayError> {
        if call.route != SEND {
            return Err(GatewayError::Internal(format!("mail adapter has no route '{}'", call.route)));
        }

        let req: MailRequest = read_json(call.request, self.max_body_bytes).await?;
        let reply = call_with_deadline(
            BackendKind::Mail.as_str(),
            call.timeout,
            &call.cancel,
            self.service.send_mail(req),
        )
        .await?;
        json_ok(&reply)
    }
}
