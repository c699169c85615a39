// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session registry: the single source of truth for which tenants are
//! connected, and through which device session.
//!
//! Invariant: at most one live session per tenant. The map insert happens
//! synchronously inside [`ensure_session`] -- the transport factory is a
//! non-async call -- so two concurrent connect requests for the same
//! tenant cannot both reach the factory.
//!
//! Reconnect policy: a terminal disconnect (logged out) removes the
//! session and stops. A transient disconnect removes the session and
//! schedules exactly one reconnect attempt after a fixed delay; a second
//! transient drop inside the delay window does not schedule another.
//!
//! [`ensure_session`]: SessionRegistry::ensure_session

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use hantar_core::types::{DeviceEvent, DeviceInfo, DisconnectReason, TenantId};
use hantar_core::{DeviceTransportFactory, HantarError, RecordStore};

use crate::device::DeviceSession;
use crate::persist::best_effort;
use crate::reconciler::Reconciler;

/// Live view of one tenant's session, for status and health reporting.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub tenant_id: String,
    pub is_authenticated: bool,
    pub device_info: Option<DeviceInfo>,
    pub has_qr: bool,
}

pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    sessions: DashMap<String, Arc<DeviceSession>>,
    /// Pending one-shot reconnect timers, keyed by tenant.
    reconnects: DashMap<String, JoinHandle<()>>,
    factory: Arc<dyn DeviceTransportFactory>,
    store: Arc<dyn RecordStore>,
    reconciler: Reconciler,
    credentials_root: PathBuf,
    reconnect_delay: Duration,
}

impl SessionRegistry {
    pub fn new(
        factory: Arc<dyn DeviceTransportFactory>,
        store: Arc<dyn RecordStore>,
        credentials_root: PathBuf,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions: DashMap::new(),
                reconnects: DashMap::new(),
                factory,
                reconciler: Reconciler::new(store.clone()),
                store,
                credentials_root,
                reconnect_delay,
            }),
        }
    }

    /// Return the tenant's live session, creating and connecting one if
    /// none exists. A call racing an in-flight connect returns the
    /// in-flight session rather than opening a duplicate connection.
    pub fn ensure_session(&self, tenant: &TenantId) -> Result<Arc<DeviceSession>, HantarError> {
        self.inner.clone().ensure_session(tenant)
    }

    /// Last-seen pairing code, if pairing is pending for this tenant.
    pub fn qr(&self, tenant: &TenantId) -> Option<String> {
        self.inner
            .sessions
            .get(&tenant.0)
            .and_then(|session| session.qr())
    }

    /// Live status for a tenant, or `None` if no session is registered.
    pub fn status(&self, tenant: &TenantId) -> Option<SessionSnapshot> {
        self.inner
            .sessions
            .get(&tenant.0)
            .map(|session| snapshot(&session))
    }

    /// Tenant's live session, only if it is authenticated. This is the
    /// precondition check for sends; it does not wait.
    pub fn authenticated_session(
        &self,
        tenant: &TenantId,
    ) -> Result<Arc<DeviceSession>, HantarError> {
        self.inner
            .sessions
            .get(&tenant.0)
            .filter(|session| session.is_authenticated())
            .map(|session| session.clone())
            .ok_or_else(|| HantarError::NotConnected {
                tenant: tenant.0.clone(),
            })
    }

    /// Log out the tenant's session, remove it, and delete the tenant's
    /// authentication material so the next connect starts a fresh pairing.
    pub async fn disconnect(&self, tenant: &TenantId) -> Result<(), HantarError> {
        self.inner.cancel_reconnect(tenant);

        let (_, session) =
            self.inner
                .sessions
                .remove(&tenant.0)
                .ok_or_else(|| HantarError::NotFound {
                    what: "session",
                    id: tenant.0.clone(),
                })?;

        if let Err(e) = session.logout().await {
            warn!(tenant = %tenant, error = %e, "logout failed during disconnect");
        }

        best_effort(
            "session flag",
            self.inner.store.set_session_connected(&tenant.0, false, None),
        )
        .await;

        let dir = self.inner.credentials_dir(tenant);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(tenant = %tenant, error = %e, "failed to delete credential directory");
            }
        }

        info!(tenant = %tenant, "session disconnected");
        Ok(())
    }

    /// Snapshot of all live sessions, for the health endpoint.
    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        self.inner
            .sessions
            .iter()
            .map(|entry| snapshot(entry.value()))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Best-effort shutdown drain: log out every live session and cancel
    /// pending reconnect timers. Individual failures are logged and do not
    /// block the remaining sessions.
    pub async fn drain(&self) {
        for entry in self.inner.reconnects.iter() {
            entry.value().abort();
        }
        self.inner.reconnects.clear();

        let sessions: Vec<Arc<DeviceSession>> = self
            .inner
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.inner.sessions.clear();

        info!(count = sessions.len(), "draining live sessions");
        for session in sessions {
            if let Err(e) = session.logout().await {
                warn!(tenant = %session.tenant(), error = %e, "session close failed during drain");
            }
        }
    }
}

fn snapshot(session: &Arc<DeviceSession>) -> SessionSnapshot {
    SessionSnapshot {
        tenant_id: session.tenant().0.clone(),
        is_authenticated: session.is_authenticated(),
        device_info: session.device_info(),
        has_qr: session.qr().is_some(),
    }
}

impl RegistryInner {
    fn credentials_dir(&self, tenant: &TenantId) -> PathBuf {
        self.credentials_root.join(&tenant.0)
    }

    fn cancel_reconnect(&self, tenant: &TenantId) {
        if let Some((_, handle)) = self.reconnects.remove(&tenant.0) {
            handle.abort();
            debug!(tenant = %tenant, "cancelled pending reconnect");
        }
    }

    fn ensure_session(
        self: Arc<Self>,
        tenant: &TenantId,
    ) -> Result<Arc<DeviceSession>, HantarError> {
        // An explicit connect supersedes any scheduled reconnect.
        self.cancel_reconnect(tenant);

        match self.sessions.entry(tenant.0.clone()) {
            Entry::Occupied(existing) => Ok(existing.get().clone()),
            Entry::Vacant(slot) => {
                let dir = self.credentials_dir(tenant);
                std::fs::create_dir_all(&dir).map_err(|e| HantarError::Transport {
                    message: format!("cannot create credential directory {}", dir.display()),
                    source: Some(Box::new(e)),
                })?;

                // Synchronous create + insert: no suspension point between
                // the vacancy check and the map write.
                let (transport, events) = self.factory.create(tenant, &dir);
                let session = Arc::new(DeviceSession::new(tenant.clone(), transport));
                slot.insert(session.clone());

                let pump_session = session.clone();
                let inner = self.clone();
                let pump_tenant = tenant.clone();
                tokio::spawn(async move {
                    inner.pump_events(pump_tenant, pump_session, events).await;
                });

                let connect_session = session.clone();
                let connect_tenant = tenant.clone();
                tokio::spawn(async move {
                    if let Err(e) = connect_session.connect().await {
                        warn!(tenant = %connect_tenant, error = %e, "connect failed");
                    }
                });

                info!(tenant = %tenant, "session created");
                Ok(session)
            }
        }
    }

    /// Consume the transport's event stream until it closes.
    async fn pump_events(
        self: Arc<Self>,
        tenant: TenantId,
        session: Arc<DeviceSession>,
        mut events: mpsc::Receiver<DeviceEvent>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                DeviceEvent::QrIssued { code } => {
                    debug!(tenant = %tenant, "pairing code issued");
                    session.set_qr(code);
                }
                DeviceEvent::ConnectionOpened { info } => {
                    info!(
                        tenant = %tenant,
                        device = info.device_name.as_deref().unwrap_or("unknown"),
                        "connection opened"
                    );
                    session.clear_qr();
                    best_effort(
                        "session flag",
                        self.store.set_session_connected(&tenant.0, true, Some(&info)),
                    )
                    .await;
                }
                DeviceEvent::ConnectionClosed { reason } => {
                    self.clone().handle_closed(&tenant, &session, reason).await;
                }
                DeviceEvent::Receipt {
                    message_id,
                    recipient,
                    status,
                } => {
                    self.reconciler.apply(&message_id, &recipient, status).await;
                }
                DeviceEvent::ContactsSynced { contacts } => {
                    match serde_json::to_string(&contacts) {
                        Ok(json) => {
                            best_effort(
                                "contact snapshot",
                                self.store.save_contacts(&tenant.0, &json),
                            )
                            .await;
                        }
                        Err(e) => {
                            warn!(tenant = %tenant, error = %e, "contact snapshot not serializable");
                        }
                    }
                }
            }
        }
        debug!(tenant = %tenant, "event stream closed");
    }

    async fn handle_closed(
        self: Arc<Self>,
        tenant: &TenantId,
        session: &Arc<DeviceSession>,
        reason: DisconnectReason,
    ) {
        warn!(tenant = %tenant, reason = %reason, "connection closed");

        // Evict and schedule before any await so a racing status query
        // never observes a dead session. Only evict the entry if it still
        // points at this session; a reconnect may already have replaced it.
        self.sessions
            .remove_if(&tenant.0, |_, current| Arc::ptr_eq(current, session));

        if reason.is_terminal() {
            info!(tenant = %tenant, "logged out, not reconnecting");
        } else {
            self.clone().schedule_reconnect(tenant);
        }

        best_effort(
            "session flag",
            self.store.set_session_connected(&tenant.0, false, None),
        )
        .await;
    }

    /// Schedule the single delayed reconnect attempt. A timer already
    /// pending for this tenant wins; we never double-schedule.
    fn schedule_reconnect(self: Arc<Self>, tenant: &TenantId) {
        match self.reconnects.entry(tenant.0.clone()) {
            Entry::Occupied(_) => {
                debug!(tenant = %tenant, "reconnect already scheduled");
            }
            Entry::Vacant(slot) => {
                let inner = self.clone();
                let tenant = tenant.clone();
                info!(tenant = %tenant, delay = ?inner.reconnect_delay, "scheduling reconnect");
                let delay = inner.reconnect_delay;
                slot.insert(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    inner.reconnects.remove(&tenant.0);
                    info!(tenant = %tenant, "attempting reconnect");
                    if let Err(e) = inner.clone().ensure_session(&tenant) {
                        warn!(tenant = %tenant, error = %e, "reconnect failed");
                    }
                }));
            }
        }
    }
}
