// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Hantar messaging service.
//!
//! Exposes session pairing, status, contacts, and the blast pipeline as a
//! camelCase JSON API over axum.

pub mod handlers;
pub mod server;

pub use server::{GatewayState, ServerConfig, build_router, start_server};
