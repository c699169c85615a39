// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device transport capability trait.
//!
//! The actual WhatsApp multi-device protocol (pairing, encryption, device
//! sync) is an external collaborator. Hantar only depends on this narrow
//! surface: connect, send, logout, and a stream of [`DeviceEvent`]s. A
//! fake implementation drives the engine tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::HantarError;
use crate::types::{DeviceEvent, DeviceInfo, MessageId, TenantId};

/// One tenant's connection to the messaging provider.
///
/// The registry owns exactly one transport per tenant and never shares it
/// across tenants.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Open the connection. Pairing and authentication happen
    /// asynchronously; progress is reported through the event stream.
    async fn connect(&self) -> Result<(), HantarError>;

    /// Send a text message to a transport address (JID). Fails with
    /// [`HantarError::Send`] if the handle is not authenticated or the
    /// transport rejects the send.
    async fn send_text(&self, jid: &str, text: &str) -> Result<MessageId, HantarError>;

    /// Close the connection and discard the device pairing.
    /// Must be idempotent: logging out an already-closed session is a no-op.
    async fn logout(&self) -> Result<(), HantarError>;

    /// Whether the underlying handle reports a logged-in identity.
    fn is_authenticated(&self) -> bool;

    /// Metadata about the paired device, once authenticated.
    fn device_info(&self) -> Option<DeviceInfo>;
}

/// Constructs transports for the session registry.
///
/// `create` is deliberately synchronous: the registry inserts the session
/// entry under its lock without crossing a suspension point, which is what
/// guarantees at-most-one live session per tenant under concurrent
/// connect requests.
pub trait DeviceTransportFactory: Send + Sync {
    /// Build a transport for `tenant`, persisting authentication material
    /// under `credentials_dir` (a directory unique to the tenant). Returns
    /// the transport and the receiving half of its event stream. The
    /// connection itself is opened later via [`DeviceTransport::connect`].
    fn create(
        &self,
        tenant: &TenantId,
        credentials_dir: &Path,
    ) -> (Arc<dyn DeviceTransport>, mpsc::Receiver<DeviceEvent>);
}
