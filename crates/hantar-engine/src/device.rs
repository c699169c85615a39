// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant device session.
//!
//! Wraps one [`DeviceTransport`] handle together with the last-seen
//! pairing code. The registry owns exactly one `DeviceSession` per tenant;
//! the QR cache is refreshed on each `QrIssued` event and cleared once the
//! connection authenticates.

use std::sync::Arc;
use std::sync::Mutex;

use hantar_core::types::{DeviceInfo, MessageId, TenantId};
use hantar_core::{DeviceTransport, HantarError};

/// One tenant's live (or pairing-pending) device connection.
pub struct DeviceSession {
    tenant: TenantId,
    transport: Arc<dyn DeviceTransport>,
    qr: Mutex<Option<String>>,
}

impl DeviceSession {
    pub fn new(tenant: TenantId, transport: Arc<dyn DeviceTransport>) -> Self {
        Self {
            tenant,
            transport,
            qr: Mutex::new(None),
        }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Last pairing code seen, if pairing is still pending.
    pub fn qr(&self) -> Option<String> {
        self.qr.lock().map(|g| g.clone()).unwrap_or(None)
    }

    pub(crate) fn set_qr(&self, code: String) {
        if let Ok(mut guard) = self.qr.lock() {
            *guard = Some(code);
        }
    }

    pub(crate) fn clear_qr(&self) {
        if let Ok(mut guard) = self.qr.lock() {
            *guard = None;
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.transport.is_authenticated()
    }

    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.transport.device_info()
    }

    pub async fn connect(&self) -> Result<(), HantarError> {
        self.transport.connect().await
    }

    /// Send a text message through the underlying transport.
    pub async fn send_text(&self, jid: &str, text: &str) -> Result<MessageId, HantarError> {
        self.transport.send_text(jid, text).await
    }

    /// Log out and discard the pairing. Idempotent.
    pub async fn logout(&self) -> Result<(), HantarError> {
        self.transport.logout().await
    }
}

/// Format a phone number as a transport address (JID). Strips everything
/// but digits, matching what the upstream provider accepts.
pub fn phone_to_jid(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!("{digits}@s.whatsapp.net")
}

/// Substitute every occurrence of the literal `{name}` token. Without a
/// name the template is sent unchanged, placeholder included.
pub fn personalize(template: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => template.replace("{name}", name),
        None => template.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jid_strips_formatting() {
        assert_eq!(phone_to_jid("+60 12-345 6789"), "60123456789@s.whatsapp.net");
        assert_eq!(phone_to_jid("60123"), "60123@s.whatsapp.net");
    }

    #[test]
    fn personalize_substitutes_every_token() {
        assert_eq!(
            personalize("Hi {name}! Bye {name}.", Some("Aina")),
            "Hi Aina! Bye Aina."
        );
    }

    #[test]
    fn personalize_without_name_keeps_template() {
        assert_eq!(personalize("Hi {name}!", None), "Hi {name}!");
    }
}
