// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Weir webhook bridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level Weir configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WeirConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP server bind settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage target settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Ingestion pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "weir".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Storage target configuration.
///
/// Each entry in `targets` maps a target name (used in webhook routes, e.g.
/// `/webhook/primary/incoming`) to the SQLite database path backing it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Target name -> database file path.
    #[serde(default = "default_targets")]
    pub targets: BTreeMap<String, String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(),
        }
    }
}

fn default_targets() -> BTreeMap<String, String> {
    let data_dir = dirs::data_dir()
        .map(|p| p.join("weir"))
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    let mut targets = BTreeMap::new();
    for name in ["primary", "vip"] {
        targets.insert(
            name.to_string(),
            data_dir
                .join(format!("{name}.db"))
                .to_string_lossy()
                .into_owned(),
        );
    }
    targets
}

/// Ingestion pipeline tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Bounded event queue capacity.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Number of worker tasks draining the queue.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Consecutive failures before the circuit breaker opens.
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: u32,

    /// Seconds the breaker stays open before closing again.
    #[serde(default = "default_breaker_cooldown_secs")]
    pub breaker_cooldown_secs: u64,

    /// Hard deadline for a single storage operation, in milliseconds.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            workers: default_workers(),
            breaker_threshold: default_breaker_threshold(),
            breaker_cooldown_secs: default_breaker_cooldown_secs(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_workers() -> usize {
    4
}

fn default_breaker_threshold() -> u32 {
    10
}

fn default_breaker_cooldown_secs() -> u64 {
    60
}

fn default_op_timeout_ms() -> u64 {
    5_000
}
