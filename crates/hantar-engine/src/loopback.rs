// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loopback device transport.
//!
//! An in-process transport that pairs instantly and acknowledges every
//! send with a delivered receipt. Selected with `transport.kind =
//! "loopback"` (the default); it lets the whole service run end-to-end
//! with no external protocol library. The [`DeviceTransport`] trait
//! boundary is where a real adapter plugs in.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use hantar_core::types::{
    DeviceEvent, DeviceInfo, DisconnectReason, MessageId, ReceiptStatus, TenantId,
};
use hantar_core::{DeviceTransport, DeviceTransportFactory, HantarError};

pub struct LoopbackTransport {
    tenant: TenantId,
    events: mpsc::Sender<DeviceEvent>,
    authenticated: AtomicBool,
}

#[async_trait]
impl DeviceTransport for LoopbackTransport {
    async fn connect(&self) -> Result<(), HantarError> {
        // Issue a pairing code, then authenticate immediately.
        let code = format!("loopback-pairing-{}", self.tenant);
        self.send_event(DeviceEvent::QrIssued { code }).await?;

        self.authenticated.store(true, Ordering::SeqCst);
        self.send_event(DeviceEvent::ConnectionOpened {
            info: self.identity(),
        })
        .await
    }

    async fn send_text(&self, jid: &str, _text: &str) -> Result<MessageId, HantarError> {
        if !self.authenticated.load(Ordering::SeqCst) {
            return Err(HantarError::Send {
                message: "loopback transport is not authenticated".into(),
                source: None,
            });
        }
        let message_id = MessageId(Uuid::new_v4().to_string());
        // Acknowledge delivery straight back through the event stream.
        self.send_event(DeviceEvent::Receipt {
            message_id: message_id.clone(),
            recipient: jid.to_string(),
            status: ReceiptStatus::Delivered,
        })
        .await?;
        Ok(message_id)
    }

    async fn logout(&self) -> Result<(), HantarError> {
        // Idempotent: only the first call emits a close event.
        if self.authenticated.swap(false, Ordering::SeqCst) {
            // The registry may have dropped the receiver already; a closed
            // channel during logout is not an error.
            let _ = self
                .events
                .send(DeviceEvent::ConnectionClosed {
                    reason: DisconnectReason::LoggedOut,
                })
                .await;
        }
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        self.authenticated
            .load(Ordering::SeqCst)
            .then(|| self.identity())
    }
}

impl LoopbackTransport {
    fn identity(&self) -> DeviceInfo {
        DeviceInfo {
            device_name: Some(format!("loopback:{}", self.tenant)),
            phone_number: Some("0000000000".to_string()),
        }
    }

    async fn send_event(&self, event: DeviceEvent) -> Result<(), HantarError> {
        self.events
            .send(event)
            .await
            .map_err(|e| HantarError::Transport {
                message: "loopback event stream closed".into(),
                source: Some(Box::new(e)),
            })
    }
}

/// Factory for [`LoopbackTransport`] sessions. Credentials directories are
/// created by the registry but left empty; there is nothing to pair.
#[derive(Default)]
pub struct LoopbackFactory;

impl DeviceTransportFactory for LoopbackFactory {
    fn create(
        &self,
        tenant: &TenantId,
        _credentials_dir: &Path,
    ) -> (Arc<dyn DeviceTransport>, mpsc::Receiver<DeviceEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let transport = Arc::new(LoopbackTransport {
            tenant: tenant.clone(),
            events: tx,
            authenticated: AtomicBool::new(false),
        });
        (transport, rx)
    }
}
