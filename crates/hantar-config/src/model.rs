// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Hantar gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Hantar configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HantarConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Device credential storage settings.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Pacing and retry timings.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Device transport selection.
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
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
    "hantar".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum number of blast jobs returned by the history endpoint.
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            history_page_size: default_history_page_size(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_history_page_size() -> u32 {
    50
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("hantar").join("hantar.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "hantar.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Device credential storage configuration.
///
/// Each tenant's authentication material lives in its own subdirectory of
/// `dir` and is deleted wholesale on disconnect.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsConfig {
    /// Root directory for per-tenant credential subdirectories.
    #[serde(default = "default_credentials_dir")]
    pub dir: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            dir: default_credentials_dir(),
        }
    }
}

fn default_credentials_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("hantar").join("credentials"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "credentials".to_string())
}

/// Pacing and reconnect timings.
///
/// The defaults match the upstream provider's tolerances; lowering
/// `message_gap_secs` risks tripping its abuse detection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    /// Delay before the single reconnect attempt after a transient drop.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Pause between consecutive recipients in a blast.
    #[serde(default = "default_message_gap_secs")]
    pub message_gap_secs: u64,

    /// How long the connect endpoint waits for a QR code to materialize.
    #[serde(default = "default_qr_wait_secs")]
    pub qr_wait_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay_secs(),
            message_gap_secs: default_message_gap_secs(),
            qr_wait_secs: default_qr_wait_secs(),
        }
    }
}

fn default_reconnect_delay_secs() -> u64 {
    3
}

fn default_message_gap_secs() -> u64 {
    3
}

fn default_qr_wait_secs() -> u64 {
    2
}

/// Device transport selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Transport implementation to use. `loopback` is the in-process
    /// development transport; a real protocol adapter registers its own
    /// kind string.
    #[serde(default = "default_transport_kind")]
    pub kind: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: default_transport_kind(),
        }
    }
}

fn default_transport_kind() -> String {
    "loopback".to_string()
}
