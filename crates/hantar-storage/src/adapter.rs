// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the RecordStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use hantar_config::model::StorageConfig;
use hantar_core::types::{BlastRecord, DeliveryStatus, DeviceInfo, MessageRecord, SessionRecord};
use hantar_core::{HantarError, RecordStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed record store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened on the first call to
/// [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: SqliteStore::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database at the configured path and run migrations.
    pub async fn initialize(&self) -> Result<(), HantarError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| HantarError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    /// Checkpoint the WAL and release the connection.
    pub async fn close(&self) -> Result<(), HantarError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }

    fn db(&self) -> Result<&Database, HantarError> {
        self.db.get().ok_or_else(|| HantarError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    // --- Tenant session rows ---

    async fn upsert_session(&self, record: &SessionRecord) -> Result<(), HantarError> {
        queries::sessions::upsert_session(self.db()?, record).await
    }

    async fn get_session(&self, tenant_id: &str) -> Result<Option<SessionRecord>, HantarError> {
        queries::sessions::get_session(self.db()?, tenant_id).await
    }

    async fn set_session_connected(
        &self,
        tenant_id: &str,
        connected: bool,
        info: Option<&DeviceInfo>,
    ) -> Result<(), HantarError> {
        queries::sessions::set_session_connected(self.db()?, tenant_id, connected, info).await
    }

    async fn save_contacts(
        &self,
        tenant_id: &str,
        contacts_json: &str,
    ) -> Result<(), HantarError> {
        queries::sessions::save_contacts(self.db()?, tenant_id, contacts_json).await
    }

    async fn mark_all_disconnected(&self) -> Result<u64, HantarError> {
        queries::sessions::mark_all_disconnected(self.db()?).await
    }

    // --- Blast jobs ---

    async fn create_blast(&self, record: &BlastRecord) -> Result<(), HantarError> {
        queries::blasts::create_blast(self.db()?, record).await
    }

    async fn get_blast(&self, id: &str) -> Result<Option<BlastRecord>, HantarError> {
        queries::blasts::get_blast(self.db()?, id).await
    }

    async fn update_blast_progress(
        &self,
        id: &str,
        successful: i64,
        failed: i64,
    ) -> Result<(), HantarError> {
        queries::blasts::update_blast_progress(self.db()?, id, successful, failed).await
    }

    async fn complete_blast(
        &self,
        id: &str,
        successful: i64,
        failed: i64,
        errors_json: &str,
        completed_at: &str,
    ) -> Result<(), HantarError> {
        queries::blasts::complete_blast(self.db()?, id, successful, failed, errors_json, completed_at)
            .await
    }

    async fn list_blasts(
        &self,
        tenant_id: &str,
        limit: i64,
    ) -> Result<Vec<BlastRecord>, HantarError> {
        queries::blasts::list_blasts(self.db()?, tenant_id, limit).await
    }

    // --- Message records ---

    async fn insert_message(&self, record: &MessageRecord) -> Result<(), HantarError> {
        queries::messages::insert_message(self.db()?, record).await
    }

    async fn get_message_by_provider_id(
        &self,
        message_id: &str,
    ) -> Result<Option<MessageRecord>, HantarError> {
        queries::messages::get_message_by_provider_id(self.db()?, message_id).await
    }

    async fn advance_message_status(
        &self,
        id: &str,
        status: DeliveryStatus,
        at: &str,
    ) -> Result<(), HantarError> {
        queries::messages::advance_message_status(self.db()?, id, status, at).await
    }

    async fn list_messages_for_blast(
        &self,
        blast_id: &str,
    ) -> Result<Vec<MessageRecord>, HantarError> {
        queries::messages::list_messages_for_blast(self.db()?, blast_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        store.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        store.initialize().await.unwrap();
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn queries_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        assert!(store.get_session("studio-1").await.is_err());
    }

    #[tokio::test]
    async fn full_blast_lifecycle_through_store() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));
        store.initialize().await.unwrap();

        let blast = BlastRecord {
            id: "b1".to_string(),
            tenant_id: "studio-1".to_string(),
            message: "Hello {name}".to_string(),
            status: hantar_core::types::BlastStatus::InProgress,
            total: 2,
            successful: 0,
            failed: 0,
            errors: "[]".to_string(),
            started_at: "2026-01-01T00:00:00.000Z".to_string(),
            completed_at: None,
        };
        store.create_blast(&blast).await.unwrap();

        let message = MessageRecord {
            id: "m1".to_string(),
            blast_id: Some("b1".to_string()),
            tenant_id: "studio-1".to_string(),
            message_id: Some("WAMID-1".to_string()),
            recipient_phone: "60123456789".to_string(),
            recipient_name: Some("Aini".to_string()),
            content: "Hello Aini".to_string(),
            status: DeliveryStatus::Sent,
            error: None,
            sent_at: Some("2026-01-01T00:00:01.000Z".to_string()),
            delivered_at: None,
            read_at: None,
            failed_at: None,
            created_at: "2026-01-01T00:00:01.000Z".to_string(),
        };
        store.insert_message(&message).await.unwrap();
        store.update_blast_progress("b1", 1, 0).await.unwrap();
        store
            .complete_blast("b1", 1, 1, r#"[{"phone":"602","error":"send failed"}]"#, "2026-01-01T00:00:05.000Z")
            .await
            .unwrap();

        let finished = store.get_blast("b1").await.unwrap().unwrap();
        assert_eq!(finished.status, hantar_core::types::BlastStatus::Completed);
        assert_eq!(finished.successful, 1);
        assert_eq!(finished.failed, 1);

        let messages = store.list_messages_for_blast("b1").await.unwrap();
        assert_eq!(messages.len(), 1);

        store
            .advance_message_status("m1", DeliveryStatus::Delivered, "2026-01-01T00:00:07.000Z")
            .await
            .unwrap();
        let updated = store
            .get_message_by_provider_id("WAMID-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, DeliveryStatus::Delivered);

        store.close().await.unwrap();
    }
}
