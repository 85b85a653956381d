//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe proxy destinations
//! - Update destination health markers based on results

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::health::passive::{self, AttemptOutcome};
use crate::load_balancer::{ClusterDestinationSet, Destination};

pub struct HealthMonitor {
    clusters: Vec<Arc<ClusterDestinationSet>>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(clusters: Vec<Arc<ClusterDestinationSet>>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            clusters,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.active_enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            clusters = self.clusters.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn check_all(&self) {
        for cluster in &self.clusters {
            for destination in cluster.destinations() {
                let outcome = self.probe(destination).await;
                passive::observe(destination, outcome);
            }
        }
    }

    async fn probe(&self, destination: &Destination) -> AttemptOutcome {
        let mut url = destination.descriptor.address.clone();
        url.set_path(&self.config.path);
        let id = destination.descriptor.id.as_str();

        let request = match Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header("user-agent", "api-gateway-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(destination = %id, error = %e, "Failed to build health check request");
                return AttemptOutcome::ConnectError;
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => AttemptOutcome::Response(response.status()),
            Ok(Ok(response)) => {
                tracing::warn!(destination = %id, status = %response.status(), "Health check failed: non-success status");
                AttemptOutcome::ProbeFailed(response.status())
            }
            Ok(Err(e)) => {
                tracing::warn!(destination = %id, error = %e, "Health check failed: connection error");
                AttemptOutcome::ConnectError
            }
            Err(_) => {
                tracing::warn!(destination = %id, "Health check failed: timeout");
                AttemptOutcome::Timeout
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{BackendDescriptor, Protocol};
    use axum::{routing::get, Router};

    fn cluster_for(address: &str) -> Arc<ClusterDestinationSet> {
        Arc::new(ClusterDestinationSet::new(
            "probe",
            vec![BackendDescriptor {
                id: "d1".into(),
                address: url::Url::parse(address).unwrap(),
                protocol: Protocol::Http,
                weight: 1,
                cluster_id: Some("probe".into()),
            }],
            Duration::from_secs(60),
        ))
    }

    #[tokio::test]
    async fn test_failed_probe_marks_unhealthy_and_success_recovers() {
        let cluster = cluster_for("http://127.0.0.1:1");
        let monitor = HealthMonitor::new(vec![cluster.clone()], HealthCheckConfig::default());

        monitor.check_all().await;
        assert!(!cluster.destinations()[0].health.is_healthy());

        let app = Router::new().route("/health", get(|| async { "ok" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let cluster = cluster_for(&format!("http://{addr}"));
        cluster.destinations()[0].health.mark_failure();
        let monitor = HealthMonitor::new(vec![cluster.clone()], HealthCheckConfig::default());
        monitor.check_all().await;
        assert!(cluster.destinations()[0].health.is_healthy());
    }
}
