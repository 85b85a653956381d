//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing clusters)
//! - Validate value ranges (timeouts > 0, weights >= 1)
//! - Validate addresses (bind address, backend and destination URLs)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Pattern-level checks (duplicates, parameters) belong to route compilation

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Validate a parsed configuration, returning every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let backends = [
        ("backends.auth.url", &config.backends.auth.url),
        ("backends.logger.url", &config.backends.logger.url),
        ("backends.mail.url", &config.backends.mail.url),
        ("backends.image.url", &config.backends.image.url),
    ];
    for (field, url) in backends {
        if let Err(reason) = check_http_url(url) {
            errors.push(ValidationError::new(field, reason));
        }
    }

    if config.timeouts.dial_ms == 0 {
        errors.push(ValidationError::new("timeouts.dial_ms", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.proxy_default_ms == 0 {
        errors.push(ValidationError::new("timeouts.proxy_default_ms", "must be greater than 0"));
    }
    if config.bridge.default_timeout_ms == 0 {
        errors.push(ValidationError::new("bridge.default_timeout_ms", "must be greater than 0"));
    }
    for (route, ms) in &config.bridge.route_timeouts_ms {
        if *ms == 0 {
            errors.push(ValidationError::new(
                format!("bridge.route_timeouts_ms.{route}"),
                "must be greater than 0",
            ));
        }
    }
    if config.bridge.max_upload_bytes == 0 {
        errors.push(ValidationError::new("bridge.max_upload_bytes", "must be greater than 0"));
    }
    if config.bridge.max_json_body_bytes == 0 {
        errors.push(ValidationError::new("bridge.max_json_body_bytes", "must be greater than 0"));
    }

    let mut cluster_ids = HashSet::new();
    for (i, cluster) in config.clusters.iter().enumerate() {
        let field = format!("clusters[{i}]");
        if cluster.id.trim().is_empty() {
            errors.push(ValidationError::new(format!("{field}.id"), "must not be empty"));
        } else if !cluster_ids.insert(cluster.id.as_str()) {
            errors.push(ValidationError::new(
                format!("{field}.id"),
                format!("duplicate cluster id '{}'", cluster.id),
            ));
        }
        if cluster.destinations.is_empty() {
            errors.push(ValidationError::new(
                format!("{field}.destinations"),
                "cluster has no destinations",
            ));
        }
        let mut names = HashSet::new();
        for (j, dest) in cluster.destinations.iter().enumerate() {
            let dest_field = format!("{field}.destinations[{j}]");
            if !names.insert(dest.name.as_str()) {
                errors.push(ValidationError::new(
                    format!("{dest_field}.name"),
                    format!("duplicate destination name '{}'", dest.name),
                ));
            }
            if let Err(reason) = check_http_url(&dest.address) {
                errors.push(ValidationError::new(format!("{dest_field}.address"), reason));
            }
            if dest.weight == 0 {
                errors.push(ValidationError::new(format!("{dest_field}.weight"), "must be at least 1"));
            }
        }
    }

    for (i, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{i}]");
        if !cluster_ids.contains(route.cluster.as_str()) {
            errors.push(ValidationError::new(
                format!("{field}.cluster"),
                format!("unknown cluster '{}'", route.cluster),
            ));
        }
        if !route.path.starts_with('/') {
            errors.push(ValidationError::new(format!("{field}.path"), "must start with '/'"));
        }
        for method in &route.methods {
            if method.parse::<Method>().is_err() {
                errors.push(ValidationError::new(
                    format!("{field}.methods"),
                    format!("invalid method '{method}'"),
                ));
            }
        }
        if route.timeout_ms == Some(0) {
            errors.push(ValidationError::new(format!("{field}.timeout_ms"), "must be greater than 0"));
        }
    }

    if config.health.active_enabled && config.health.interval_secs == 0 {
        errors.push(ValidationError::new("health.interval_secs", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("'{raw}' is not a valid URL: {e}"))?;
    if url.scheme() != "http" {
        return Err(format!("'{raw}' must use the http scheme"));
    }
    if url.host_str().is_none() {
        return Err(format!("'{raw}' has no host"));
    }
    Ok(())
}
