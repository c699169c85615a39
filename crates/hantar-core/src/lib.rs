// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Hantar WhatsApp gateway.
//!
//! This crate provides the foundational trait definitions, error type, and
//! common types used throughout the Hantar workspace. The device protocol
//! and the persistence backend both plug in through traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::HantarError;
pub use traits::{DeviceTransport, DeviceTransportFactory, RecordStore};
pub use types::{
    BlastError, BlastProgress, BlastRecord, BlastStatus, BlastSummary, Contact, DeliveryStatus,
    DeviceEvent, DeviceInfo, DisconnectReason, MessageId, MessageRecord, Recipient, ReceiptStatus,
    SessionRecord, TenantId,
};
