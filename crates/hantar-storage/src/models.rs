// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical row types are defined in `hantar-core::types` for use
//! across the `RecordStore` trait boundary. This module re-exports them
//! and provides the row-mapping helpers shared by the query modules.

use std::str::FromStr;

pub use hantar_core::types::{BlastRecord, BlastStatus, DeliveryStatus, MessageRecord, SessionRecord};

/// Parse a stored delivery status, surfacing bad data as a conversion error.
pub(crate) fn parse_delivery_status(
    column: usize,
    raw: String,
) -> Result<DeliveryStatus, rusqlite::Error> {
    DeliveryStatus::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse a stored blast status.
pub(crate) fn parse_blast_status(
    column: usize,
    raw: String,
) -> Result<BlastStatus, rusqlite::Error> {
    BlastStatus::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}
