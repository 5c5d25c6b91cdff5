//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from `waypoint.toml`.

use serde::{Deserialize, Serialize};

/// Root configuration for the router.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Listener configuration (hostname, port).
    pub listener: ListenerConfig,

    /// Route file naming conventions.
    pub routes: RoutesConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub hostname: String,

    /// TCP port. `0` picks a free port.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            hostname: "0.0.0.0".to_string(),
            port: 4500,
        }
    }
}

impl ListenerConfig {
    /// `hostname:port` as passed to the TCP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

/// How route file names are interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutesConfig {
    /// Extension stripped from route file names.
    pub extension: String,

    /// Method suffixes recognised in file names (`users.get.rs`).
    pub methods: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            extension: ".rs".to_string(),
            methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Total request timeout in seconds.
    pub request_secs: u64,

    /// Seconds to wait for in-flight requests on shutdown.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_secs: 10,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
