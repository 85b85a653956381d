//! Logger bridge.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;

use crate::bridge::{read_json, BridgeAdapter, BridgeCall, RouteSpec};
use crate::error::GatewayError;
use crate::http::response::{json_ok, OutboundResult};
use crate::resilience::call_with_deadline;
use crate::upstream::proto::LogRequest;
use crate::upstream::{BackendKind, LoggerService};

pub const LOG_INFO: &str = "Logger_LogInfo";

pub struct LoggerAdapter {
    service: Arc<dyn LoggerService>,
    max_body_bytes: usize,
}

impl LoggerAdapter {
    pub fn new(service: Arc<dyn LoggerService>, max_body_bytes: usize) -> Self {
        Self {
            service,
            max_body_bytes,
        }
    }
}

#[async_trait]
impl BridgeAdapter for LoggerAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::Logger
    }

    fn routes(&self) -> Vec<RouteSpec> {
        vec![RouteSpec::new(LOG_INFO, Method::POST, "/api/v1/Logger/log")]
    }

    async fn handle(&self, call: BridgeCall) -> Result<OutboundResult, GatewayError> {
        if call.route != LOG_INFO {
            return Err(GatewayError::Internal(format!("logger adapter has no route '{}'", call.route)));
        }

        let req: LogRequest = read_json(call.request, self.max_body_bytes).await?;
        let reply = call_with_deadline(
            BackendKind::Logger.as_str(),
            call.timeout,
            &call.cancel,
            self.service.log_info(req),
        )
        .await?;
        json_ok(&reply)
    }
}
