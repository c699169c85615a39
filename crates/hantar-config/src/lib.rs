// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Hantar gateway.
//!
//! TOML files (XDG hierarchy) layered with `HANTAR_*` environment
//! variables via figment, deserialized into `deny_unknown_fields`
//! structs, then semantically validated. Failures come back as miette
//! diagnostics with typo suggestions.
//!
//! ```no_run
//! let config = hantar_config::load_and_validate().expect("config errors");
//! println!("listening on {}:{}", config.gateway.host, config.gateway.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::HantarConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// The single entry point the binary uses: figment load, then semantic
/// validation; figment errors are enriched with source spans from
/// whichever TOML files exist on this machine.
pub fn load_and_validate() -> Result<HantarConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Load configuration from an explicit file and validate it, bypassing
/// the XDG lookup. Environment overrides still apply.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<HantarConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .ok()
            .map(|content| (path.display().to_string(), content))
            .into_iter()
            .collect()
    })
}

/// Load configuration from a TOML string and validate it. For tests and
/// embedded use.
pub fn load_and_validate_str(toml_content: &str) -> Result<HantarConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

fn finish(
    loaded: Result<HantarConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<HantarConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Read whichever config files exist, for diagnostic span resolution.
/// Mirrors the loader's lookup order.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut candidates = vec![std::path::PathBuf::from("/etc/hantar/hantar.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("hantar/hantar.toml"));
    }
    let local = std::env::current_dir()
        .map(|d| d.join("hantar.toml"))
        .unwrap_or_else(|_| std::path::PathBuf::from("hantar.toml"));
    candidates.push(local);

    candidates
        .into_iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            Some((path.display().to_string(), content))
        })
        .collect()
}
