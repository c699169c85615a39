// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Receipt reconciler: translates transport receipt events into message
//! record status transitions.
//!
//! Transitions are forward-only; a late receipt never regresses a record.
//! Receipts for unknown message ids (sent outside this system) are dropped
//! silently. No retries: a failed write is logged and the next receipt,
//! if any, gets its own chance.

use std::sync::Arc;

use tracing::debug;

use hantar_core::RecordStore;
use hantar_core::types::{MessageId, ReceiptStatus};

use crate::persist::{best_effort, now_rfc3339};

pub struct Reconciler {
    store: Arc<dyn RecordStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Apply one receipt event to the persisted message record.
    pub async fn apply(&self, message_id: &MessageId, recipient: &str, status: ReceiptStatus) {
        let Some(next) = status.delivery_transition() else {
            // Pending / server-ack receipts carry no persisted transition.
            return;
        };

        let record = match self.store.get_message_by_provider_id(&message_id.0).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(message_id = %message_id.0, recipient, "receipt for unknown message, dropped");
                return;
            }
            Err(e) => {
                tracing::warn!(message_id = %message_id.0, error = %e, "receipt lookup failed");
                return;
            }
        };

        if !record.status.can_advance_to(next) {
            debug!(
                message_id = %message_id.0,
                current = %record.status,
                next = %next,
                "receipt ignored, would regress status"
            );
            return;
        }

        best_effort(
            "message status",
            self.store
                .advance_message_status(&record.id, next, &now_rfc3339()),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hantar_core::types::{DeliveryStatus, MessageRecord};
    use hantar_storage::SqliteStore;
    use tempfile::tempdir;

    async fn setup_store() -> (Arc<SqliteStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = hantar_config::model::StorageConfig {
            database_path: dir.path().join("test.db").to_str().unwrap().to_string(),
            wal_mode: true,
        };
        let store = Arc::new(SqliteStore::new(config));
        store.initialize().await.unwrap();
        (store, dir)
    }

    fn sent_record(id: &str, provider_id: &str) -> MessageRecord {
        MessageRecord {
            id: id.to_string(),
            blast_id: None,
            tenant_id: "studio-1".to_string(),
            message_id: Some(provider_id.to_string()),
            recipient_phone: "60123".to_string(),
            recipient_name: None,
            content: "hello".to_string(),
            status: DeliveryStatus::Sent,
            error: None,
            sent_at: Some("2026-01-01T00:00:00.000Z".to_string()),
            delivered_at: None,
            read_at: None,
            failed_at: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn delivered_receipt_advances_record() {
        let (store, _dir) = setup_store().await;
        store.insert_message(&sent_record("m1", "W1")).await.unwrap();
        let reconciler = Reconciler::new(store.clone());

        reconciler
            .apply(&MessageId("W1".into()), "60123", ReceiptStatus::Delivered)
            .await;

        let record = store.get_message_by_provider_id("W1").await.unwrap().unwrap();
        assert_eq!(record.status, DeliveryStatus::Delivered);
        assert!(record.delivered_at.is_some());
    }

    #[tokio::test]
    async fn late_receipt_never_regresses() {
        let (store, _dir) = setup_store().await;
        store.insert_message(&sent_record("m1", "W1")).await.unwrap();
        let reconciler = Reconciler::new(store.clone());

        reconciler
            .apply(&MessageId("W1".into()), "60123", ReceiptStatus::Read)
            .await;
        // A delivered receipt arriving after read must be ignored.
        reconciler
            .apply(&MessageId("W1".into()), "60123", ReceiptStatus::Delivered)
            .await;

        let record = store.get_message_by_provider_id("W1").await.unwrap().unwrap();
        assert_eq!(record.status, DeliveryStatus::Read);
    }

    #[tokio::test]
    async fn unknown_message_id_is_dropped_silently() {
        let (store, _dir) = setup_store().await;
        let reconciler = Reconciler::new(store.clone());

        // Must not error or create a record.
        reconciler
            .apply(&MessageId("nope".into()), "60123", ReceiptStatus::Read)
            .await;
        assert!(
            store
                .get_message_by_provider_id("nope")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn pending_and_server_ack_are_ignored() {
        let (store, _dir) = setup_store().await;
        store.insert_message(&sent_record("m1", "W1")).await.unwrap();
        let reconciler = Reconciler::new(store.clone());

        reconciler
            .apply(&MessageId("W1".into()), "60123", ReceiptStatus::Pending)
            .await;
        reconciler
            .apply(&MessageId("W1".into()), "60123", ReceiptStatus::ServerAck)
            .await;

        let record = store.get_message_by_provider_id("W1").await.unwrap().unwrap();
        assert_eq!(record.status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn error_receipt_marks_record_errored() {
        let (store, _dir) = setup_store().await;
        store.insert_message(&sent_record("m1", "W1")).await.unwrap();
        let reconciler = Reconciler::new(store.clone());

        reconciler
            .apply(&MessageId("W1".into()), "60123", ReceiptStatus::Error)
            .await;

        let record = store.get_message_by_provider_id("W1").await.unwrap().unwrap();
        assert_eq!(record.status, DeliveryStatus::Error);
        assert!(record.failed_at.is_some());
    }
}
