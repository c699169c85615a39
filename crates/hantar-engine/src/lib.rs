// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session and messaging engine for the Hantar gateway.
//!
//! Holds the session registry (at-most-one live device session per
//! tenant, reconnect policy), the receipt reconciler, the sequential
//! rate-limited blast pipeline, and the loopback development transport.

pub mod blast;
pub mod device;
pub mod loopback;
pub mod persist;
pub mod reconciler;
pub mod registry;
pub mod shutdown;

pub use blast::BlastPipeline;
pub use device::DeviceSession;
pub use loopback::LoopbackFactory;
pub use registry::{SessionRegistry, SessionSnapshot};
