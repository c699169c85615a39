// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message record row operations.

use hantar_core::HantarError;
use hantar_core::types::DeliveryStatus;
use rusqlite::params;

use crate::database::Database;
use crate::models::{MessageRecord, parse_delivery_status};

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<MessageRecord, rusqlite::Error> {
    Ok(MessageRecord {
        id: row.get(0)?,
        blast_id: row.get(1)?,
        tenant_id: row.get(2)?,
        message_id: row.get(3)?,
        recipient_phone: row.get(4)?,
        recipient_name: row.get(5)?,
        content: row.get(6)?,
        status: parse_delivery_status(7, row.get(7)?)?,
        error: row.get(8)?,
        sent_at: row.get(9)?,
        delivered_at: row.get(10)?,
        read_at: row.get(11)?,
        failed_at: row.get(12)?,
        created_at: row.get(13)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, blast_id, tenant_id, message_id, recipient_phone, \
     recipient_name, content, status, error, sent_at, delivered_at, read_at, failed_at, created_at";

/// Insert a new message record.
pub async fn insert_message(db: &Database, record: &MessageRecord) -> Result<(), HantarError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO message_records
                     (id, blast_id, tenant_id, message_id, recipient_phone, recipient_name,
                      content, status, error, sent_at, delivered_at, read_at, failed_at,
                      created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    record.id,
                    record.blast_id,
                    record.tenant_id,
                    record.message_id,
                    record.recipient_phone,
                    record.recipient_name,
                    record.content,
                    record.status.to_string(),
                    record.error,
                    record.sent_at,
                    record.delivered_at,
                    record.read_at,
                    record.failed_at,
                    record.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a record by the transport-assigned message id.
pub async fn get_message_by_provider_id(
    db: &Database,
    message_id: &str,
) -> Result<Option<MessageRecord>, HantarError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM message_records WHERE message_id = ?1"
            ))?;
            let result = stmt.query_row(params![message_id], row_to_message);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a status transition, stamping the matching timestamp column.
/// Monotonicity is the caller's concern; this writes what it is told.
pub async fn advance_message_status(
    db: &Database,
    id: &str,
    status: DeliveryStatus,
    at: &str,
) -> Result<(), HantarError> {
    let id = id.to_string();
    let at = at.to_string();
    let stamp_column = match status {
        DeliveryStatus::Sent => "sent_at",
        DeliveryStatus::Delivered => "delivered_at",
        DeliveryStatus::Read => "read_at",
        DeliveryStatus::Failed | DeliveryStatus::Error => "failed_at",
    };
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!("UPDATE message_records SET status = ?1, {stamp_column} = ?2 WHERE id = ?3"),
                params![status, at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All message records belonging to a blast, in insertion order.
pub async fn list_messages_for_blast(
    db: &Database,
    blast_id: &str,
) -> Result<Vec<MessageRecord>, HantarError> {
    let blast_id = blast_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM message_records
                 WHERE blast_id = ?1 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![blast_id], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
