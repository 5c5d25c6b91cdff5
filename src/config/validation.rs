//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, body limit > 0)
//! - Check addresses, log levels and method tokens
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::routing::route::MethodToken;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending key.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.hostname.trim().is_empty() {
        errors.push(ValidationError::new("listener.hostname", "must not be empty"));
    }

    let extension = &config.routes.extension;
    if !extension.is_empty() && !extension.starts_with('.') {
        errors.push(ValidationError::new(
            "routes.extension",
            format!("`{}` must start with `.`", extension),
        ));
    }
    if config.routes.methods.is_empty() {
        errors.push(ValidationError::new("routes.methods", "must list at least one method"));
    }
    for method in &config.routes.methods {
        if !matches!(method.parse::<MethodToken>(), Ok(MethodToken::Named(_))) {
            errors.push(ValidationError::new(
                "routes.methods",
                format!("`{}` is not a method name", method),
            ));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::new("limits.max_body_size", "must be greater than 0"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("`{}` is not one of {}", config.observability.log_level, LOG_LEVELS.join(", ")),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("`{}` is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
