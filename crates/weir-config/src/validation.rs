// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses and non-zero pipeline sizes.

use crate::diagnostic::ConfigError;
use crate::model::WeirConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WeirConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate host is not empty and looks like an IP or hostname.
    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    // At least one storage target must exist; names and paths must be non-empty.
    if config.storage.targets.is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.targets must define at least one target".to_string(),
        });
    }
    for (name, path) in &config.storage.targets {
        if name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "storage.targets contains an empty target name".to_string(),
            });
        } else if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            // Target names appear in URL paths; keep them route-safe.
            errors.push(ConfigError::Validation {
                message: format!(
                    "storage target name `{name}` may only contain alphanumerics, `-`, and `_`"
                ),
            });
        }
        if path.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("storage.targets.{name} must not be an empty path"),
            });
        }
    }

    // Pipeline sizes must be positive.
    if config.pipeline.queue_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "pipeline.queue_capacity must be at least 1".to_string(),
        });
    }
    if config.pipeline.workers == 0 {
        errors.push(ConfigError::Validation {
            message: "pipeline.workers must be at least 1".to_string(),
        });
    }
    if config.pipeline.breaker_threshold == 0 {
        errors.push(ConfigError::Validation {
            message: "pipeline.breaker_threshold must be at least 1".to_string(),
        });
    }
    if config.pipeline.op_timeout_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "pipeline.op_timeout_ms must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
