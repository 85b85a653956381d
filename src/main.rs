//! API Gateway
//!
//! Single entry point for clients. Typed routes are translated into calls on
//! the Auth, Logger, Mail and Image gRPC backends; configured routes are
//! proxied verbatim to weighted clusters of HTTP destinations.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                      API GATEWAY                     │
//!                      │                                                      │
//!   Client Request     │  ┌─────────┐    ┌────────────┐    ┌──────────────┐   │
//!   ───────────────────┼─▶│  http   │───▶│ dispatcher │───▶│   routing    │   │
//!                      │  │ server  │    │            │    │  RouteTable  │   │
//!                      │  └─────────┘    └─────┬──────┘    └──────────────┘   │
//!                      │                 bridge│      proxy                   │
//!                      │               ┌───────┴──────┐                       │
//!                      │               ▼              ▼                       │
//!                      │        ┌────────────┐  ┌─────────────┐               │
//!                      │        │  bridge    │  │   proxy     │               │
//!                      │        │  adapters  │  │  forwarder  │               │
//!                      │        └─────┬──────┘  └──────┬──────┘               │
//!                      │              ▼                ▼                      │
//!                      │        ┌────────────┐  ┌─────────────┐               │
//!                      │        │ upstream   │  │load_balancer│               │
//!                      │        │ gRPC pool  │  │  + health   │               │
//!                      │        └─────┬──────┘  └──────┬──────┘               │
//!                      └──────────────┼────────────────┼──────────────────────┘
//!                                     ▼                ▼
//!                              gRPC backends     HTTP destinations
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use api_gateway::config::{apply_env_overrides, load_config, validate_config, ConfigError};
use api_gateway::lifecycle::wait_for_signal;
use api_gateway::observability::{logging, metrics};
use api_gateway::{GatewayConfig, HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "api-gateway", version, about = "HTTP API gateway with gRPC bridges and a reverse-proxy fallback")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = GatewayConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("api-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        clusters = config.clusters.len(),
        proxy_routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
