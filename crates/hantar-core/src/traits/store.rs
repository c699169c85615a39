// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record store trait for persistence backends.

use async_trait::async_trait;

use crate::error::HantarError;
use crate::types::{BlastRecord, DeliveryStatus, DeviceInfo, MessageRecord, SessionRecord};

/// Persistence surface for session state, blast jobs, and per-message
/// delivery records.
///
/// Callers on the hot path (blast pipeline, reconciler) treat write
/// failures as non-fatal; the trait itself reports them faithfully and
/// leaves the swallow-and-log policy to the engine.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // --- Tenant session rows ---

    /// Insert or replace the persisted state for a tenant.
    async fn upsert_session(&self, record: &SessionRecord) -> Result<(), HantarError>;

    async fn get_session(&self, tenant_id: &str) -> Result<Option<SessionRecord>, HantarError>;

    /// Flip the connected flag, recording device metadata and the
    /// last-connected timestamp when a session authenticates.
    async fn set_session_connected(
        &self,
        tenant_id: &str,
        connected: bool,
        info: Option<&DeviceInfo>,
    ) -> Result<(), HantarError>;

    /// Replace the tenant's contact snapshot (JSON blob).
    async fn save_contacts(&self, tenant_id: &str, contacts_json: &str)
    -> Result<(), HantarError>;

    /// Crash recovery: mark every session row disconnected. Returns the
    /// number of rows touched.
    async fn mark_all_disconnected(&self) -> Result<u64, HantarError>;

    // --- Blast jobs ---

    async fn create_blast(&self, record: &BlastRecord) -> Result<(), HantarError>;

    async fn get_blast(&self, id: &str) -> Result<Option<BlastRecord>, HantarError>;

    /// Update running counts while a blast is in progress.
    async fn update_blast_progress(
        &self,
        id: &str,
        successful: i64,
        failed: i64,
    ) -> Result<(), HantarError>;

    /// Final bookkeeping: set completed status, counts, and the error list.
    async fn complete_blast(
        &self,
        id: &str,
        successful: i64,
        failed: i64,
        errors_json: &str,
        completed_at: &str,
    ) -> Result<(), HantarError>;

    /// Blast history for a tenant, newest first, capped at `limit`.
    async fn list_blasts(&self, tenant_id: &str, limit: i64)
    -> Result<Vec<BlastRecord>, HantarError>;

    // --- Message records ---

    async fn insert_message(&self, record: &MessageRecord) -> Result<(), HantarError>;

    /// Look up a record by the transport-assigned message id. Receipts for
    /// messages sent outside this system find nothing; that is not an error.
    async fn get_message_by_provider_id(
        &self,
        message_id: &str,
    ) -> Result<Option<MessageRecord>, HantarError>;

    /// Apply a forward status transition, stamping the matching timestamp
    /// column. The caller is responsible for the monotonicity check.
    async fn advance_message_status(
        &self,
        id: &str,
        status: DeliveryStatus,
        at: &str,
    ) -> Result<(), HantarError>;

    async fn list_messages_for_blast(
        &self,
        blast_id: &str,
    ) -> Result<Vec<MessageRecord>, HantarError>;
}
