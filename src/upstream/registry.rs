//! Backend registry.
//!
//! # Responsibilities
//! - Describe every typed RPC backend (address, protocol)
//! - Group proxy destinations into clusters
//! - Hand out read-only descriptors to the pool and the forwarder
//!
//! # Design Decisions
//! - Built once at startup, shared read-only afterwards
//! - Only destination health markers change at runtime (inside the clusters)

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::config::{ConfigError, GatewayConfig};
use crate::load_balancer::ClusterDestinationSet;

/// The typed backends reachable through bridge routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Auth,
    Logger,
    Mail,
    Image,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Auth,
        BackendKind::Logger,
        BackendKind::Mail,
        BackendKind::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Auth => "auth",
            BackendKind::Logger => "logger",
            BackendKind::Mail => "mail",
            BackendKind::Image => "image",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire protocol spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// gRPC over cleartext HTTP/2.
    Grpc,
    /// Plain HTTP, forwarded verbatim.
    Http,
}

/// Static description of one backend or proxy destination.
#[derive(Debug, Clone)]
pub struct BackendDescriptor {
    pub id: String,
    pub address: Url,
    pub protocol: Protocol,
    pub weight: u32,
    pub cluster_id: Option<String>,
}

/// All backends and clusters known to the gateway.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    services: HashMap<BackendKind, BackendDescriptor>,
    clusters: HashMap<String, Arc<ClusterDestinationSet>>,
}

impl BackendRegistry {
    /// Build the registry from configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let mut registry = Self::default();

        let services = [
            (BackendKind::Auth, &config.backends.auth.url),
            (BackendKind::Logger, &config.backends.logger.url),
            (BackendKind::Mail, &config.backends.mail.url),
            (BackendKind::Image, &config.backends.image.url),
        ];
        for (kind, url) in services {
            registry.insert_service(
                kind,
                BackendDescriptor {
                    id: kind.as_str().to_string(),
                    address: parse_address(url)?,
                    protocol: Protocol::Grpc,
                    weight: 1,
                    cluster_id: None,
                },
            );
        }

        let cooldown = config.health.cooldown();
        for cluster in &config.clusters {
            let mut descriptors = Vec::with_capacity(cluster.destinations.len());
            for dest in &cluster.destinations {
                descriptors.push(BackendDescriptor {
                    id: dest.name.clone(),
                    address: parse_address(&dest.address)?,
                    protocol: Protocol::Http,
                    weight: dest.weight.max(1),
                    cluster_id: Some(cluster.id.clone()),
                });
            }
            registry.insert_cluster(&cluster.id, descriptors, cooldown);
        }

        tracing::info!(
            services = registry.services.len(),
            clusters = registry.clusters.len(),
            "Backend registry built"
        );
        Ok(registry)
    }

    /// Register (or replace) a typed backend.
    pub fn insert_service(&mut self, kind: BackendKind, descriptor: BackendDescriptor) {
        self.services.insert(kind, descriptor);
    }

    /// Register a proxy cluster.
    pub fn insert_cluster(&mut self, id: &str, destinations: Vec<BackendDescriptor>, cooldown: Duration) {
        self.clusters.insert(
            id.to_string(),
            Arc::new(ClusterDestinationSet::new(id, destinations, cooldown)),
        );
    }

    pub fn service(&self, kind: BackendKind) -> Option<&BackendDescriptor> {
        self.services.get(&kind)
    }

    pub fn services(&self) -> impl Iterator<Item = (BackendKind, &BackendDescriptor)> {
        self.services.iter().map(|(k, d)| (*k, d))
    }

    pub fn cluster(&self, id: &str) -> Option<Arc<ClusterDestinationSet>> {
        self.clusters.get(id).cloned()
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Arc<ClusterDestinationSet>> {
        self.clusters.values()
    }
}

fn parse_address(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidAddress {
        address: raw.to_string(),
        reason: e.to_string(),
    })
}
