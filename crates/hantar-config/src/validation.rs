// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::HantarConfig;

const KNOWN_TRANSPORTS: &[&str] = &["loopback"];
const KNOWN_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)`
/// with all collected validation errors (does not fail fast).
pub fn validate_config(config: &HantarConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.gateway.history_page_size == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.history_page_size must be at least 1".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.credentials.dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "credentials.dir must not be empty".to_string(),
        });
    }

    if !KNOWN_LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "service.log_level `{}` is not one of: {}",
                config.service.log_level,
                KNOWN_LOG_LEVELS.join(", ")
            ),
        });
    }

    if !KNOWN_TRANSPORTS.contains(&config.transport.kind.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "transport.kind `{}` is not one of: {}",
                config.transport.kind,
                KNOWN_TRANSPORTS.join(", ")
            ),
        });
    }

    // A zero message gap defeats the provider's pacing expectations; allow
    // it only implicitly through tests overriding the config in code.
    if config.timing.message_gap_secs > 3600 {
        errors.push(ConfigError::Validation {
            message: format!(
                "timing.message_gap_secs must be at most 3600, got {}",
                config.timing.message_gap_secs
            ),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let config = HantarConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn blank_database_path_is_rejected() {
        let mut config = HantarConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn unknown_transport_fails_validation() {
        let mut config = HantarConfig::default();
        config.transport.kind = "carrier-pigeon".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("transport.kind"))
        ));
    }

    #[test]
    fn bad_log_level_fails_validation() {
        let mut config = HantarConfig::default();
        config.service.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("log_level"))
        ));
    }

    #[test]
    fn zero_page_size_fails_validation() {
        let mut config = HantarConfig::default();
        config.gateway.history_page_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn custom_values_pass_validation() {
        let mut config = HantarConfig::default();
        config.gateway.host = "0.0.0.0".to_string();
        config.storage.database_path = "/tmp/hantar-test.db".to_string();
        config.timing.message_gap_secs = 1;
        assert!(validate_config(&config).is_ok());
    }
}
