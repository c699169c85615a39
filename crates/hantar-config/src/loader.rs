// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./hantar.toml` > `~/.config/hantar/hantar.toml`
//! > `/etc/hantar/hantar.toml` with environment variable overrides via the
//! `HANTAR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::HantarConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/hantar/hantar.toml` (system-wide)
/// 3. `~/.config/hantar/hantar.toml` (user XDG config)
/// 4. `./hantar.toml` (local directory)
/// 5. `HANTAR_*` environment variables
pub fn load_config() -> Result<HantarConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<HantarConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HantarConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HantarConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HantarConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for
/// diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(HantarConfig::default()))
        .merge(Toml::file("/etc/hantar/hantar.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("hantar/hantar.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("hantar.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// key names stay unambiguous: `HANTAR_STORAGE_DATABASE_PATH` must map to
/// `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("HANTAR_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("credentials_", "credentials.", 1)
            .replacen("timing_", "timing.", 1)
            .replacen("transport_", "transport.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[service]
log_level = "debug"

[gateway]
port = 4000
"#,
        )
        .unwrap();
        assert_eq!(config.service.log_level, "debug");
        assert_eq!(config.gateway.port, 4000);
        // Untouched sections keep their defaults.
        assert_eq!(config.timing.qr_wait_secs, 2);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.service.name, "hantar");
    }
}
