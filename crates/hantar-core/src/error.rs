// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Hantar gateway.

use thiserror::Error;

/// The primary error type used across all Hantar crates.
#[derive(Debug, Error)]
pub enum HantarError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Request validation errors (missing tenant id, empty recipients, empty message).
    #[error("validation error: {0}")]
    Validation(String),

    /// A send or blast was attempted with no live, authenticated session.
    /// The caller must connect the tenant first; sends are never queued.
    #[error("tenant `{tenant}` is not connected")]
    NotConnected { tenant: String },

    /// A referenced entity (session, QR code, blast job) does not exist.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// A single outbound send failed at the transport. Isolated to the
    /// recipient by the blast pipeline; never aborts a whole blast.
    #[error("send failed: {message}")]
    Send {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Device transport errors (connection failure, protocol rejection).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
