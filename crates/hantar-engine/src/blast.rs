// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blast pipeline: one message to an ordered list of recipients through
//! one tenant's session.
//!
//! Recipients are processed strictly sequentially with a fixed pause
//! between sends; the upstream provider penalizes burst traffic.
//! Correctness here means "every recipient attempted, in order, with
//! independent failure" -- a single recipient's failure never aborts the
//! rest, and bookkeeping writes never block the sends themselves.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use hantar_core::types::{
    BlastError, BlastProgress, BlastRecord, BlastStatus, BlastSummary, DeliveryStatus,
    MessageRecord, Recipient, TenantId,
};
use hantar_core::{HantarError, RecordStore};

use crate::device::{personalize, phone_to_jid};
use crate::persist::{best_effort, now_rfc3339};
use crate::registry::SessionRegistry;

pub struct BlastPipeline {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn RecordStore>,
    /// Pause between consecutive recipients.
    message_gap: Duration,
}

impl BlastPipeline {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn RecordStore>,
        message_gap: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            message_gap,
        }
    }

    /// Run one blast to completion and return its summary.
    ///
    /// Fails fast only on invalid input or a missing/unauthenticated
    /// session; past those preconditions it always returns a summary,
    /// however many recipients failed.
    pub async fn run(
        &self,
        tenant: &TenantId,
        recipients: &[Recipient],
        message: &str,
    ) -> Result<BlastSummary, HantarError> {
        if tenant.0.trim().is_empty() {
            return Err(HantarError::Validation("tenant id is required".into()));
        }
        if recipients.is_empty() {
            return Err(HantarError::Validation(
                "at least one recipient is required".into(),
            ));
        }
        if message.trim().is_empty() {
            return Err(HantarError::Validation("message is required".into()));
        }

        // Precondition, not a wait: the caller must connect first.
        let session = self.registry.authenticated_session(tenant)?;

        let blast_id = self.create_job(tenant, recipients, message).await;

        let mut success_count: u32 = 0;
        let mut fail_count: u32 = 0;
        let mut errors: Vec<BlastError> = Vec::new();

        info!(
            tenant = %tenant,
            recipients = recipients.len(),
            "blast started"
        );

        for (index, recipient) in recipients.iter().enumerate() {
            let jid = phone_to_jid(&recipient.phone);
            let content = personalize(message, recipient.name.as_deref());
            let now = now_rfc3339();

            match session.send_text(&jid, &content).await {
                Ok(message_id) => {
                    success_count += 1;
                    self.record_message(
                        tenant,
                        blast_id.as_deref(),
                        recipient,
                        &content,
                        Some(message_id.0),
                        None,
                        &now,
                    )
                    .await;
                }
                Err(e) => {
                    fail_count += 1;
                    let error = e.to_string();
                    warn!(tenant = %tenant, phone = %recipient.phone, error = %error, "send failed");
                    errors.push(BlastError {
                        phone: recipient.phone.clone(),
                        error: error.clone(),
                    });
                    self.record_message(
                        tenant,
                        blast_id.as_deref(),
                        recipient,
                        &content,
                        None,
                        Some(error),
                        &now,
                    )
                    .await;
                }
            }

            if let Some(id) = blast_id.as_deref() {
                best_effort(
                    "blast progress",
                    self.store.update_blast_progress(
                        id,
                        i64::from(success_count),
                        i64::from(fail_count),
                    ),
                )
                .await;
            }

            if index + 1 < recipients.len() {
                tokio::time::sleep(self.message_gap).await;
            }
        }

        if let Some(id) = blast_id.as_deref() {
            let errors_json =
                serde_json::to_string(&errors).unwrap_or_else(|_| "[]".to_string());
            best_effort(
                "blast completion",
                self.store.complete_blast(
                    id,
                    i64::from(success_count),
                    i64::from(fail_count),
                    &errors_json,
                    &now_rfc3339(),
                ),
            )
            .await;
        }

        info!(
            tenant = %tenant,
            successful = success_count,
            failed = fail_count,
            "blast completed"
        );

        Ok(BlastSummary {
            blast_id,
            success_count,
            fail_count,
            errors,
        })
    }

    /// Point-in-time progress snapshot for a blast job.
    pub async fn progress(&self, blast_id: &str) -> Result<BlastProgress, HantarError> {
        let record = self
            .store
            .get_blast(blast_id)
            .await?
            .ok_or_else(|| HantarError::NotFound {
                what: "blast",
                id: blast_id.to_string(),
            })?;
        Ok(BlastProgress::from_record(&record))
    }

    /// Create the job row. Failure is non-fatal: sending proceeds without
    /// durable bookkeeping, and the summary carries a null blast id.
    async fn create_job(
        &self,
        tenant: &TenantId,
        recipients: &[Recipient],
        message: &str,
    ) -> Option<String> {
        let id = Uuid::new_v4().to_string();
        let record = BlastRecord {
            id: id.clone(),
            tenant_id: tenant.0.clone(),
            message: message.to_string(),
            status: BlastStatus::InProgress,
            total: recipients.len() as i64,
            successful: 0,
            failed: 0,
            errors: "[]".to_string(),
            started_at: now_rfc3339(),
            completed_at: None,
        };
        match self.store.create_blast(&record).await {
            Ok(()) => Some(id),
            Err(e) => {
                warn!(tenant = %tenant, error = %e, "blast job not persisted, sending anyway");
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_message(
        &self,
        tenant: &TenantId,
        blast_id: Option<&str>,
        recipient: &Recipient,
        content: &str,
        message_id: Option<String>,
        error: Option<String>,
        now: &str,
    ) {
        let failed = error.is_some();
        let record = MessageRecord {
            id: Uuid::new_v4().to_string(),
            blast_id: blast_id.map(str::to_string),
            tenant_id: tenant.0.clone(),
            message_id,
            recipient_phone: recipient.phone.clone(),
            recipient_name: recipient.name.clone(),
            content: content.to_string(),
            status: if failed {
                DeliveryStatus::Failed
            } else {
                DeliveryStatus::Sent
            },
            error,
            sent_at: (!failed).then(|| now.to_string()),
            delivered_at: None,
            read_at: None,
            failed_at: failed.then(|| now.to_string()),
            created_at: now.to_string(),
        };
        best_effort("message record", self.store.insert_message(&record)).await;
    }
}
