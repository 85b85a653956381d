//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variables that override backend URLs.
pub const AUTH_URL_ENV: &str = "AUTH_SERVICE_URL";
pub const LOGGER_URL_ENV: &str = "LOGGER_SERVICE_URL";
pub const MAIL_URL_ENV: &str = "MAIL_SERVICE_URL";
pub const IMAGE_URL_ENV: &str = "IMAGE_SERVICE_URL";

/// Error type for configuration loading and route compilation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("duplicate route {method} {pattern}")]
    DuplicateRoute { method: String, pattern: String },

    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("route '{route}' references undefined path parameter '{param}'")]
    UndefinedParameter { route: String, param: String },

    #[error("route '{route}' targets unknown {kind} '{target}'")]
    UnknownTarget {
        route: String,
        kind: &'static str,
        target: String,
    },

    #[error("invalid backend address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GatewayConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Replace backend URLs with values found through `lookup`.
///
/// `lookup` is the process environment in production; tests pass a closure.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let targets = [
        (AUTH_URL_ENV, &mut config.backends.auth),
        (LOGGER_URL_ENV, &mut config.backends.logger),
        (MAIL_URL_ENV, &mut config.backends.mail),
        (IMAGE_URL_ENV, &mut config.backends.image),
    ];

    for (key, backend) in targets {
        if let Some(url) = lookup(key).filter(|v| !v.trim().is_empty()) {
            tracing::info!(key, url = %url, "Backend URL overridden from environment");
            backend.url = url;
        }
    }
}
