// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./weir.toml` > `~/.config/weir/weir.toml` >
//! `/etc/weir/weir.toml`, with environment variable overrides via the
//! `WEIR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::WeirConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/weir/weir.toml` (system-wide)
/// 3. `~/.config/weir/weir.toml` (user XDG config)
/// 4. `./weir.toml` (local directory)
/// 5. `WEIR_*` environment variables
pub fn load_config() -> Result<WeirConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WeirConfig::default()))
        .merge(Toml::file("/etc/weir/weir.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("weir/weir.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("weir.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Useful for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<WeirConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WeirConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WeirConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WeirConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `WEIR_PIPELINE_QUEUE_CAPACITY` must map
/// to `pipeline.queue_capacity`, not `pipeline.queue.capacity`.
fn env_provider() -> Env {
    Env::prefixed("WEIR_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: WEIR_PIPELINE_QUEUE_CAPACITY -> "pipeline_queue_capacity"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("pipeline_", "pipeline.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.service.name, "weir");
        assert_eq!(config.pipeline.workers, 4);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[pipeline]
queue_capacity = 500
workers = 2
"#,
        )
        .unwrap();
        assert_eq!(config.pipeline.queue_capacity, 500);
        assert_eq!(config.pipeline.workers, 2);
        // Untouched fields keep their defaults.
        assert_eq!(config.pipeline.breaker_threshold, 10);
    }

    #[test]
    fn env_vars_override_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("weir.toml", "[server]\nport = 9000\n")?;
            jail.set_env("WEIR_SERVER_PORT", "9100");
            jail.set_env("WEIR_PIPELINE_QUEUE_CAPACITY", "123");
            let config = load_config().expect("config should load");
            assert_eq!(config.server.port, 9100);
            assert_eq!(config.pipeline.queue_capacity, 123);
            Ok(())
        });
    }
}
