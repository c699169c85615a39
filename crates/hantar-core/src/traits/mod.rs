// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability trait definitions.
//!
//! The device transport and record store are the two seams the engine is
//! written against; both use `#[async_trait]` for dynamic dispatch.

pub mod store;
pub mod transport;

pub use store::RecordStore;
pub use transport::{DeviceTransport, DeviceTransportFactory};
