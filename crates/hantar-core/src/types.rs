// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Hantar workspace.
//!
//! Persistence row types (`SessionRecord`, `BlastRecord`, `MessageRecord`)
//! live here rather than in the storage crate because the [`RecordStore`]
//! trait boundary refers to them.
//!
//! [`RecordStore`]: crate::traits::RecordStore

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a tenant ("studio"). Each tenant owns at most one
/// live WhatsApp device session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        TenantId(s.to_string())
    }
}

/// Message identifier assigned by the device transport at send time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Delivery lifecycle of one outbound message record.
///
/// Transitions only move forward: `Sent -> Delivered -> Read`, or directly
/// to `Failed`/`Error`. Use [`DeliveryStatus::can_advance_to`] to guard
/// updates; a late receipt must never regress a record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// The send call succeeded and the transport assigned a message id.
    Sent,
    /// The recipient's device acknowledged delivery.
    Delivered,
    /// The recipient read the message.
    Read,
    /// The local send call failed before the transport accepted it.
    Failed,
    /// The transport reported an error receipt after the send.
    Error,
}

impl DeliveryStatus {
    fn rank(self) -> u8 {
        match self {
            DeliveryStatus::Sent => 0,
            DeliveryStatus::Delivered => 1,
            DeliveryStatus::Read | DeliveryStatus::Failed | DeliveryStatus::Error => 2,
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeliveryStatus::Read | DeliveryStatus::Failed | DeliveryStatus::Error
        )
    }

    /// Whether a transition from `self` to `next` moves forward.
    pub fn can_advance_to(self, next: DeliveryStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

/// Lifecycle of a blast job. There is no cancelled state; once started a
/// blast runs to completion or process exit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BlastStatus {
    InProgress,
    Completed,
}

/// One blast recipient: a phone number and an optional display name used
/// for `{name}` personalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A contact from the device's synced address book snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Metadata about the paired device, reported once the transport
/// authenticates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_name: Option<String>,
    pub phone_number: Option<String>,
}

/// Why a device connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The account was explicitly deauthorized (logged out on the phone).
    /// Terminal: the registry must not reconnect.
    LoggedOut,
    /// Any other drop (network blip, server restart signal). Transient:
    /// the registry schedules exactly one reconnect attempt.
    Transport(String),
}

impl DisconnectReason {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DisconnectReason::LoggedOut)
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::LoggedOut => f.write_str("logged out"),
            DisconnectReason::Transport(reason) => f.write_str(reason),
        }
    }
}

/// Receipt status codes in the transport's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Pending,
    ServerAck,
    Delivered,
    Read,
    Error,
}

impl ReceiptStatus {
    /// The message-record transition this receipt implies, if any.
    /// `Pending` and `ServerAck` receipts are not persisted.
    pub fn delivery_transition(self) -> Option<DeliveryStatus> {
        match self {
            ReceiptStatus::Delivered => Some(DeliveryStatus::Delivered),
            ReceiptStatus::Read => Some(DeliveryStatus::Read),
            ReceiptStatus::Error => Some(DeliveryStatus::Error),
            ReceiptStatus::Pending | ReceiptStatus::ServerAck => None,
        }
    }
}

/// Events emitted by a device transport. These are the only signals the
/// session registry and receipt reconciler depend on.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A new pairing code was issued. Replaces any previous code.
    QrIssued { code: String },
    /// The connection opened with an authenticated identity.
    ConnectionOpened { info: DeviceInfo },
    /// The connection dropped.
    ConnectionClosed { reason: DisconnectReason },
    /// A previously sent message changed delivery state.
    Receipt {
        message_id: MessageId,
        recipient: String,
        status: ReceiptStatus,
    },
    /// The device pushed an address book snapshot.
    ContactsSynced { contacts: Vec<Contact> },
}

// --- Persistence rows ---

/// Persisted last-known state of a tenant's device session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub tenant_id: String,
    pub is_connected: bool,
    pub device_name: Option<String>,
    pub phone_number: Option<String>,
    /// RFC 3339 timestamp of the last successful authentication.
    pub last_connected_at: Option<String>,
    /// JSON-encoded contact snapshot from the last `ContactsSynced` event.
    pub contacts: Option<String>,
    pub updated_at: String,
}

/// One invocation of "send this message to these recipients".
/// Immutable once `status` is [`BlastStatus::Completed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlastRecord {
    pub id: String,
    pub tenant_id: String,
    pub message: String,
    pub status: BlastStatus,
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
    /// JSON-encoded `Vec<BlastError>`.
    pub errors: String,
    pub started_at: String,
    pub completed_at: Option<String>,
}

/// One outbound message to one recipient, tracked for delivery status.
/// Never deleted by the gateway; retention is a collaborator concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    /// Blast this send belongs to; `None` for one-off sends.
    pub blast_id: Option<String>,
    pub tenant_id: String,
    /// Transport-assigned id; `None` when the send call itself failed.
    pub message_id: Option<String>,
    pub recipient_phone: String,
    pub recipient_name: Option<String>,
    pub content: String,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub sent_at: Option<String>,
    pub delivered_at: Option<String>,
    pub read_at: Option<String>,
    pub failed_at: Option<String>,
    pub created_at: String,
}

/// A per-recipient failure collected during a blast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlastError {
    pub phone: String,
    pub error: String,
}

/// Summary returned to the caller when a blast finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlastSummary {
    /// `None` when the job row could not be created (best-effort bookkeeping).
    pub blast_id: Option<String>,
    pub success_count: u32,
    pub fail_count: u32,
    pub errors: Vec<BlastError>,
}

/// Point-in-time progress snapshot computed from a [`BlastRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlastProgress {
    pub status: BlastStatus,
    pub successful_sends: i64,
    pub failed_sends: i64,
    pub total_recipients: i64,
    pub progress_percentage: u8,
}

impl BlastProgress {
    pub fn from_record(record: &BlastRecord) -> Self {
        let done = record.successful + record.failed;
        let pct = if record.total > 0 {
            ((done as f64 / record.total as f64) * 100.0).round() as u8
        } else {
            0
        };
        Self {
            status: record.status,
            successful_sends: record.successful,
            failed_sends: record.failed,
            total_recipients: record.total,
            progress_percentage: pct,
        }
    }
}
