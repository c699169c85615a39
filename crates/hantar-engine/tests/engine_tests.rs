// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the session registry, reconnect policy, and
//! blast pipeline, driven by a scripted fake transport.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;
use tokio::sync::mpsc;

use hantar_config::model::StorageConfig;
use hantar_core::types::{
    BlastProgress, BlastRecord, BlastStatus, DeliveryStatus, DeviceEvent, DeviceInfo,
    DisconnectReason, MessageId, MessageRecord, Recipient, SessionRecord, TenantId,
};
use hantar_core::{
    DeviceTransport, DeviceTransportFactory, HantarError, RecordStore,
};
use hantar_engine::{BlastPipeline, SessionRegistry};
use hantar_storage::SqliteStore;

const RECONNECT_DELAY: Duration = Duration::from_secs(3);
const MESSAGE_GAP: Duration = Duration::from_secs(3);

// --- Fake transport ---

struct FakeTransport {
    authenticated: AtomicBool,
    connects: Arc<AtomicUsize>,
    fail_jids: Arc<Mutex<HashSet<String>>>,
    events: mpsc::Sender<DeviceEvent>,
    counter: AtomicUsize,
}

#[async_trait]
impl DeviceTransport for FakeTransport {
    async fn connect(&self) -> Result<(), HantarError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.authenticated.store(true, Ordering::SeqCst);
        let _ = self
            .events
            .send(DeviceEvent::ConnectionOpened {
                info: DeviceInfo {
                    device_name: Some("fake".into()),
                    phone_number: Some("60000".into()),
                },
            })
            .await;
        Ok(())
    }

    async fn send_text(&self, jid: &str, _text: &str) -> Result<MessageId, HantarError> {
        if self.fail_jids.lock().unwrap().contains(jid) {
            return Err(HantarError::Send {
                message: format!("transport rejected {jid}"),
                source: None,
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(MessageId(format!("FAKE-{n}")))
    }

    async fn logout(&self) -> Result<(), HantarError> {
        self.authenticated.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        self.is_authenticated().then(|| DeviceInfo {
            device_name: Some("fake".into()),
            phone_number: Some("60000".into()),
        })
    }
}

#[derive(Default)]
struct FakeFactory {
    created: AtomicUsize,
    connects: Arc<AtomicUsize>,
    fail_jids: Arc<Mutex<HashSet<String>>>,
    /// Event senders for every transport created, so tests can inject
    /// disconnects and receipts.
    senders: Mutex<Vec<mpsc::Sender<DeviceEvent>>>,
}

impl FakeFactory {
    fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    fn fail_for(&self, jid: &str) {
        self.fail_jids.lock().unwrap().insert(jid.to_string());
    }

    fn latest_sender(&self) -> mpsc::Sender<DeviceEvent> {
        self.senders.lock().unwrap().last().cloned().unwrap()
    }
}

impl DeviceTransportFactory for FakeFactory {
    fn create(
        &self,
        _tenant: &TenantId,
        _credentials_dir: &Path,
    ) -> (Arc<dyn DeviceTransport>, mpsc::Receiver<DeviceEvent>) {
        self.created.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(16);
        self.senders.lock().unwrap().push(tx.clone());
        let transport = Arc::new(FakeTransport {
            authenticated: AtomicBool::new(false),
            connects: self.connects.clone(),
            fail_jids: self.fail_jids.clone(),
            events: tx,
            counter: AtomicUsize::new(0),
        });
        (transport, rx)
    }
}

// --- Harness ---

async fn sqlite_store(dir: &tempfile::TempDir) -> Arc<SqliteStore> {
    let store = Arc::new(SqliteStore::new(StorageConfig {
        database_path: dir.path().join("test.db").to_str().unwrap().to_string(),
        wal_mode: true,
    }));
    store.initialize().await.unwrap();
    store
}

struct Harness {
    factory: Arc<FakeFactory>,
    registry: Arc<SessionRegistry>,
    pipeline: BlastPipeline,
    store: Arc<SqliteStore>,
    _dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    let dir = tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let factory = Arc::new(FakeFactory::default());
    let registry = Arc::new(SessionRegistry::new(
        factory.clone(),
        store.clone(),
        dir.path().join("credentials"),
        RECONNECT_DELAY,
    ));
    let pipeline = BlastPipeline::new(registry.clone(), store.clone(), MESSAGE_GAP);
    Harness {
        factory,
        registry,
        pipeline,
        store,
        _dir: dir,
    }
}

async fn wait_authenticated(registry: &SessionRegistry, tenant: &TenantId) {
    for _ in 0..100 {
        if registry
            .status(tenant)
            .is_some_and(|s| s.is_authenticated)
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session for {tenant} never authenticated");
}

// --- Session registry ---

#[tokio::test(start_paused = true)]
async fn concurrent_connects_open_one_connection() {
    let h = harness().await;
    let tenant = TenantId::from("t1");

    let first = h.registry.ensure_session(&tenant).unwrap();
    // A second call while the first connect is still in flight must hand
    // back the in-flight session, not open a duplicate.
    let second = h.registry.ensure_session(&tenant).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    wait_authenticated(&h.registry, &tenant).await;
    assert_eq!(h.factory.created(), 1);
    assert_eq!(h.factory.connects(), 1);
}

#[tokio::test]
async fn transient_drop_reconnects_exactly_once() {
    let h = harness().await;
    let tenant = TenantId::from("t1");
    h.registry.ensure_session(&tenant).unwrap();
    wait_authenticated(&h.registry, &tenant).await;

    h.factory
        .latest_sender()
        .send(DeviceEvent::ConnectionClosed {
            reason: DisconnectReason::Transport("stream errored".into()),
        })
        .await
        .unwrap();

    // The dead session is evicted before the delayed reconnect fires.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.registry.status(&tenant).is_none());
    assert_eq!(h.factory.created(), 1);

    tokio::time::sleep(RECONNECT_DELAY + Duration::from_millis(100)).await;
    assert_eq!(h.factory.created(), 2);
    wait_authenticated(&h.registry, &tenant).await;
}

#[tokio::test]
async fn logged_out_drop_does_not_reconnect() {
    let h = harness().await;
    let tenant = TenantId::from("t1");
    h.registry.ensure_session(&tenant).unwrap();
    wait_authenticated(&h.registry, &tenant).await;

    h.factory
        .latest_sender()
        .send(DeviceEvent::ConnectionClosed {
            reason: DisconnectReason::LoggedOut,
        })
        .await
        .unwrap();

    tokio::time::sleep(RECONNECT_DELAY * 3).await;
    assert!(h.registry.status(&tenant).is_none());
    assert_eq!(h.factory.created(), 1);
}

#[tokio::test]
async fn repeated_transient_drops_schedule_one_timer() {
    let h = harness().await;
    let tenant = TenantId::from("t1");
    h.registry.ensure_session(&tenant).unwrap();
    wait_authenticated(&h.registry, &tenant).await;

    let sender = h.factory.latest_sender();
    for _ in 0..3 {
        sender
            .send(DeviceEvent::ConnectionClosed {
                reason: DisconnectReason::Transport("flap".into()),
            })
            .await
            .unwrap();
    }

    tokio::time::sleep(RECONNECT_DELAY * 4).await;
    // One reconnect happened, not three.
    assert_eq!(h.factory.created(), 2);
}

#[tokio::test]
async fn qr_cache_follows_pairing_lifecycle() {
    let h = harness().await;
    let tenant = TenantId::from("t1");
    h.registry.ensure_session(&tenant).unwrap();
    wait_authenticated(&h.registry, &tenant).await;
    let sender = h.factory.latest_sender();

    // No pairing pending after authentication.
    assert!(h.registry.qr(&tenant).is_none());

    sender
        .send(DeviceEvent::QrIssued {
            code: "pair-me".into(),
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.registry.qr(&tenant).as_deref(), Some("pair-me"));

    // A fresh open clears the cached code.
    sender
        .send(DeviceEvent::ConnectionOpened {
            info: DeviceInfo::default(),
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(h.registry.qr(&tenant).is_none());
}

#[tokio::test(start_paused = true)]
async fn disconnect_removes_session_and_credentials() {
    let h = harness().await;
    let tenant = TenantId::from("t1");
    h.registry.ensure_session(&tenant).unwrap();
    wait_authenticated(&h.registry, &tenant).await;

    let cred_dir = h._dir.path().join("credentials").join("t1");
    assert!(cred_dir.exists());

    h.registry.disconnect(&tenant).await.unwrap();
    assert!(h.registry.status(&tenant).is_none());
    assert!(!cred_dir.exists());

    // Second disconnect finds nothing; it reports not-found, not a panic.
    let again = h.registry.disconnect(&tenant).await;
    assert!(matches!(again, Err(HantarError::NotFound { .. })));
}

#[tokio::test(start_paused = true)]
async fn connection_events_update_persisted_session() {
    let h = harness().await;
    let tenant = TenantId::from("t1");
    h.registry.ensure_session(&tenant).unwrap();
    wait_authenticated(&h.registry, &tenant).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let row = h.store.get_session("t1").await.unwrap().unwrap();
    assert!(row.is_connected);
    assert_eq!(row.device_name.as_deref(), Some("fake"));

    h.registry.disconnect(&tenant).await.unwrap();
    let row = h.store.get_session("t1").await.unwrap().unwrap();
    assert!(!row.is_connected);
}

#[tokio::test]
async fn contact_snapshot_is_persisted() {
    let h = harness().await;
    let tenant = TenantId::from("t1");
    h.registry.ensure_session(&tenant).unwrap();
    wait_authenticated(&h.registry, &tenant).await;

    h.factory
        .latest_sender()
        .send(DeviceEvent::ContactsSynced {
            contacts: vec![hantar_core::types::Contact {
                phone: "60123".into(),
                name: Some("Aini".into()),
            }],
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let row = h.store.get_session("t1").await.unwrap().unwrap();
    assert!(row.contacts.unwrap().contains("Aini"));
}

// --- Blast pipeline ---

fn recipient(phone: &str, name: Option<&str>) -> Recipient {
    Recipient {
        phone: phone.to_string(),
        name: name.map(str::to_string),
    }
}

#[tokio::test(start_paused = true)]
async fn blast_rejects_invalid_input() {
    let h = harness().await;
    let tenant = TenantId::from("t1");

    let empty_recipients = h.pipeline.run(&tenant, &[], "hi").await;
    assert!(matches!(empty_recipients, Err(HantarError::Validation(_))));

    let empty_message = h
        .pipeline
        .run(&tenant, &[recipient("60123", None)], "  ")
        .await;
    assert!(matches!(empty_message, Err(HantarError::Validation(_))));
}

#[tokio::test(start_paused = true)]
async fn blast_requires_connected_session() {
    let h = harness().await;
    let result = h
        .pipeline
        .run(&TenantId::from("t1"), &[recipient("60123", None)], "hi")
        .await;
    assert!(matches!(result, Err(HantarError::NotConnected { .. })));
}

#[tokio::test]
async fn blast_end_to_end_with_personalization() {
    let h = harness().await;
    let tenant = TenantId::from("t1");
    h.registry.ensure_session(&tenant).unwrap();
    wait_authenticated(&h.registry, &tenant).await;

    let summary = h
        .pipeline
        .run(
            &tenant,
            &[
                recipient("60123", Some("Ali")),
                recipient("60124", None),
            ],
            "Hi {name}, book now!",
        )
        .await
        .unwrap();

    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.fail_count, 0);
    assert!(summary.errors.is_empty());
    let blast_id = summary.blast_id.unwrap();

    let records = h.store.list_messages_for_blast(&blast_id).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].content, "Hi Ali, book now!");
    assert_eq!(records[0].status, DeliveryStatus::Sent);
    assert_eq!(records[1].content, "Hi {name}, book now!");
    assert_eq!(records[1].status, DeliveryStatus::Sent);

    let job = h.store.get_blast(&blast_id).await.unwrap().unwrap();
    assert_eq!(job.successful, 2);
    assert_eq!(job.failed, 0);
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn failing_recipient_does_not_abort_the_rest() {
    let h = harness().await;
    let tenant = TenantId::from("t1");
    h.registry.ensure_session(&tenant).unwrap();
    wait_authenticated(&h.registry, &tenant).await;

    h.factory.fail_for("60124@s.whatsapp.net");

    let summary = h
        .pipeline
        .run(
            &tenant,
            &[
                recipient("60123", None),
                recipient("60124", None),
                recipient("60125", None),
            ],
            "hello",
        )
        .await
        .unwrap();

    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.fail_count, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].phone, "60124");

    let blast_id = summary.blast_id.unwrap();
    let records = h.store.list_messages_for_blast(&blast_id).await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[1].status, DeliveryStatus::Failed);
    assert!(records[1].failed_at.is_some());
    assert_eq!(records[2].status, DeliveryStatus::Sent);
}

#[tokio::test(start_paused = true)]
async fn blast_progress_snapshot_after_completion() {
    let h = harness().await;
    let tenant = TenantId::from("t1");
    h.registry.ensure_session(&tenant).unwrap();
    wait_authenticated(&h.registry, &tenant).await;

    let summary = h
        .pipeline
        .run(
            &tenant,
            &[recipient("60123", None), recipient("60124", None)],
            "hello",
        )
        .await
        .unwrap();

    let progress = h
        .pipeline
        .progress(summary.blast_id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(progress.total_recipients, 2);
    assert_eq!(progress.successful_sends + progress.failed_sends, 2);
    assert_eq!(progress.progress_percentage, 100);

    let missing = h.pipeline.progress("no-such-blast").await;
    assert!(matches!(missing, Err(HantarError::NotFound { .. })));
}

#[tokio::test]
async fn blast_progress_snapshot_mid_run() {
    let h = harness().await;
    let tenant = TenantId::from("t1");
    h.registry.ensure_session(&tenant).unwrap();
    wait_authenticated(&h.registry, &tenant).await;

    let pipeline = Arc::new(h.pipeline);
    let run = tokio::spawn({
        let pipeline = pipeline.clone();
        let tenant = tenant.clone();
        async move {
            pipeline
                .run(
                    &tenant,
                    &[
                        recipient("60123", None),
                        recipient("60124", None),
                        recipient("60125", None),
                    ],
                    "hello",
                )
                .await
        }
    });

    // Poll in steps much shorter than the gap between sends, so the
    // first observation with any progress lands after the first send
    // but before the second.
    let mut mid = None;
    for _ in 0..100 {
        let jobs = h.store.list_blasts("t1", 1).await.unwrap();
        if let Some(job) = jobs.into_iter().next() {
            if job.successful + job.failed > 0 {
                mid = Some(job);
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let job = mid.expect("no progress recorded between sends");
    let progress = BlastProgress::from_record(&job);
    assert_eq!(progress.status, BlastStatus::InProgress);
    assert_eq!(progress.successful_sends + progress.failed_sends, 1);
    assert_eq!(progress.total_recipients, 3);
    assert_eq!(progress.progress_percentage, 33); // round(100 * 1/3)

    let summary = run.await.unwrap().unwrap();
    assert_eq!(summary.success_count, 3);
    let done = pipeline
        .progress(summary.blast_id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(done.status, BlastStatus::Completed);
    assert_eq!(done.progress_percentage, 100);
}

// --- Availability over durability ---

/// A store where every write and read fails, standing in for a dead
/// database.
struct DeadStore;

#[async_trait]
impl RecordStore for DeadStore {
    async fn upsert_session(&self, _: &SessionRecord) -> Result<(), HantarError> {
        Err(down())
    }
    async fn get_session(&self, _: &str) -> Result<Option<SessionRecord>, HantarError> {
        Err(down())
    }
    async fn set_session_connected(
        &self,
        _: &str,
        _: bool,
        _: Option<&DeviceInfo>,
    ) -> Result<(), HantarError> {
        Err(down())
    }
    async fn save_contacts(&self, _: &str, _: &str) -> Result<(), HantarError> {
        Err(down())
    }
    async fn mark_all_disconnected(&self) -> Result<u64, HantarError> {
        Err(down())
    }
    async fn create_blast(&self, _: &BlastRecord) -> Result<(), HantarError> {
        Err(down())
    }
    async fn get_blast(&self, _: &str) -> Result<Option<BlastRecord>, HantarError> {
        Err(down())
    }
    async fn update_blast_progress(&self, _: &str, _: i64, _: i64) -> Result<(), HantarError> {
        Err(down())
    }
    async fn complete_blast(
        &self,
        _: &str,
        _: i64,
        _: i64,
        _: &str,
        _: &str,
    ) -> Result<(), HantarError> {
        Err(down())
    }
    async fn list_blasts(&self, _: &str, _: i64) -> Result<Vec<BlastRecord>, HantarError> {
        Err(down())
    }
    async fn insert_message(&self, _: &MessageRecord) -> Result<(), HantarError> {
        Err(down())
    }
    async fn get_message_by_provider_id(
        &self,
        _: &str,
    ) -> Result<Option<MessageRecord>, HantarError> {
        Err(down())
    }
    async fn advance_message_status(
        &self,
        _: &str,
        _: DeliveryStatus,
        _: &str,
    ) -> Result<(), HantarError> {
        Err(down())
    }
    async fn list_messages_for_blast(&self, _: &str) -> Result<Vec<MessageRecord>, HantarError> {
        Err(down())
    }
}

fn down() -> HantarError {
    HantarError::Storage {
        source: "database is down".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn blast_succeeds_against_dead_store() {
    let dir = tempdir().unwrap();
    let factory = Arc::new(FakeFactory::default());
    let store: Arc<dyn RecordStore> = Arc::new(DeadStore);
    let registry = Arc::new(SessionRegistry::new(
        factory.clone(),
        store.clone(),
        dir.path().join("credentials"),
        RECONNECT_DELAY,
    ));
    let pipeline = BlastPipeline::new(registry.clone(), store, MESSAGE_GAP);

    let tenant = TenantId::from("t1");
    registry.ensure_session(&tenant).unwrap();
    wait_authenticated(&registry, &tenant).await;

    let summary = pipeline
        .run(
            &tenant,
            &[recipient("60123", None), recipient("60124", None)],
            "hello",
        )
        .await
        .unwrap();

    // Sending still succeeded; only the durable bookkeeping is missing.
    assert_eq!(summary.success_count, 2);
    assert!(summary.blast_id.is_none());
}
