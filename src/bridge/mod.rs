//! HTTP → RPC bridge.
//!
//! # Data Flow
//! ```text
//! Dispatcher (bridge route matched)
//!     → BridgeSet (adapter owning the route's backend)
//!     → adapter.handle():
//!         translate HTTP input (JSON body, query, path params, multipart)
//!         → typed service call under the route deadline
//!         → reply rendered as 200 JSON
//! ```
//!
//! # Design Decisions
//! - Routes are built in; each adapter declares the routes it serves
//! - Translation errors never reach a backend
//! - Exactly one backend call per request, no retries

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::error::GatewayError;
use crate::http::request::InboundRequest;
use crate::http::response::OutboundResult;
use crate::routing::{RouteDefinition, RouteParams, RouteTarget};
use crate::security::limits;
use crate::upstream::{BackendKind, Services};

pub mod auth;
pub mod image;
pub mod logger;
pub mod mail;

pub use auth::AuthAdapter;
pub use image::ImageAdapter;
pub use logger::LoggerAdapter;
pub use mail::MailAdapter;

/// A built-in bridge route.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub name: &'static str,
    pub method: Method,
    pub path: &'static str,
    /// Path parameters the handler reads.
    pub params: &'static [&'static str],
}

impl RouteSpec {
    pub fn new(name: &'static str, method: Method, path: &'static str) -> Self {
        Self {
            name,
            method,
            path,
            params: &[],
        }
    }

    pub fn with_params(mut self, params: &'static [&'static str]) -> Self {
        self.params = params;
        self
    }
}

/// Everything an adapter needs to serve one request.
#[derive(Debug)]
pub struct BridgeCall {
    pub route: String,
    pub params: RouteParams,
    pub request: InboundRequest,
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

/// Translates HTTP requests for one backend.
#[async_trait]
pub trait BridgeAdapter: Send + Sync {
    fn backend(&self) -> BackendKind;

    fn routes(&self) -> Vec<RouteSpec>;

    async fn handle(&self, call: BridgeCall) -> Result<OutboundResult, GatewayError>;
}

/// The adapters, keyed by backend.
#[derive(Clone, Default)]
pub struct BridgeSet {
    adapters: HashMap<BackendKind, Arc<dyn BridgeAdapter>>,
}

impl BridgeSet {
    /// The four standard adapters over `services`.
    pub fn new(services: Services, config: &BridgeConfig) -> Self {
        let mut set = Self::default();
        set.insert(Arc::new(AuthAdapter::new(services.auth, config.max_json_body_bytes)));
        set.insert(Arc::new(LoggerAdapter::new(services.logger, config.max_json_body_bytes)));
        set.insert(Arc::new(MailAdapter::new(services.mail, config.max_json_body_bytes)));
        set.insert(Arc::new(ImageAdapter::new(services.image, config.max_upload_bytes)));
        set
    }

    pub fn insert(&mut self, adapter: Arc<dyn BridgeAdapter>) {
        self.adapters.insert(adapter.backend(), adapter);
    }

    pub fn get(&self, backend: BackendKind) -> Option<&Arc<dyn BridgeAdapter>> {
        self.adapters.get(&backend)
    }

    pub fn contains(&self, backend: BackendKind) -> bool {
        self.adapters.contains_key(&backend)
    }

    /// Route definitions for every adapter, with timeouts from `config`.
    pub fn route_definitions(&self, config: &BridgeConfig) -> Vec<RouteDefinition> {
        let mut backends: Vec<_> = self.adapters.keys().copied().collect();
        backends.sort_by_key(|b| b.as_str());

        backends
            .into_iter()
            .filter_map(|b| self.adapters.get(&b))
            .flat_map(|adapter| {
                let backend = adapter.backend();
                adapter.routes().into_iter().map(move |spec| RouteDefinition {
                    name: spec.name.to_string(),
                    methods: vec![spec.method],
                    path: spec.path.to_string(),
                    target: RouteTarget::Bridge { backend },
                    params: Some(spec.params.iter().map(|p| p.to_string()).collect()),
                    timeout: config.timeout_for(spec.name),
                })
            })
            .collect()
    }
}

/// Read and decode a JSON body of at most `limit` bytes.
///
/// Object keys bind with a leading capital folded, so `UserName` reads as `userName`.
pub(crate) async fn read_json<T: DeserializeOwned>(
    request: InboundRequest,
    limit: usize,
) -> Result<T, GatewayError> {
    limits::check_content_length(&request.headers, limit)?;
    let bytes = limits::read_bounded(request.body, limit).await?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(GatewayError::translation("Request body is required"));
    }

    // Malformed JSON is left as-is so the rejection below describes it.
    let bytes = match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => serde_json::to_vec(&fold_leading_capitals(value))
            .map_err(|e| GatewayError::Internal(e.to_string()))?
            .into(),
        Err(_) => bytes,
    };

    axum::Json::<T>::from_bytes(&bytes)
        .map(|axum::Json(value)| value)
        .map_err(|rejection| GatewayError::translation(rejection.body_text()))
}

fn fold_leading_capitals(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (lower_first(&key), fold_leading_capitals(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(fold_leading_capitals).collect()),
        other => other,
    }
}

fn lower_first(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
