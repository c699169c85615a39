// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blast job row operations.

use hantar_core::HantarError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{BlastRecord, BlastStatus, parse_blast_status};

fn row_to_blast(row: &rusqlite::Row<'_>) -> Result<BlastRecord, rusqlite::Error> {
    Ok(BlastRecord {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        message: row.get(2)?,
        status: parse_blast_status(3, row.get(3)?)?,
        total: row.get(4)?,
        successful: row.get(5)?,
        failed: row.get(6)?,
        errors: row.get(7)?,
        started_at: row.get(8)?,
        completed_at: row.get(9)?,
    })
}

const BLAST_COLUMNS: &str =
    "id, tenant_id, message, status, total, successful, failed, errors, started_at, completed_at";

/// Create a new blast job row.
pub async fn create_blast(db: &Database, record: &BlastRecord) -> Result<(), HantarError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO blast_jobs
                     (id, tenant_id, message, status, total, successful, failed,
                      errors, started_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.tenant_id,
                    record.message,
                    record.status.to_string(),
                    record.total,
                    record.successful,
                    record.failed,
                    record.errors,
                    record.started_at,
                    record.completed_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a blast job by ID.
pub async fn get_blast(db: &Database, id: &str) -> Result<Option<BlastRecord>, HantarError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BLAST_COLUMNS} FROM blast_jobs WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_blast);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update running counts while a blast is in progress.
pub async fn update_blast_progress(
    db: &Database,
    id: &str,
    successful: i64,
    failed: i64,
) -> Result<(), HantarError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE blast_jobs SET successful = ?1, failed = ?2 WHERE id = ?3",
                params![successful, failed, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Final bookkeeping when a blast finishes.
pub async fn complete_blast(
    db: &Database,
    id: &str,
    successful: i64,
    failed: i64,
    errors_json: &str,
    completed_at: &str,
) -> Result<(), HantarError> {
    let id = id.to_string();
    let errors_json = errors_json.to_string();
    let completed_at = completed_at.to_string();
    let status = BlastStatus::Completed.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE blast_jobs
                 SET status = ?1, successful = ?2, failed = ?3, errors = ?4, completed_at = ?5
                 WHERE id = ?6",
                params![status, successful, failed, errors_json, completed_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Blast history for a tenant, newest first.
pub async fn list_blasts(
    db: &Database,
    tenant_id: &str,
    limit: i64,
) -> Result<Vec<BlastRecord>, HantarError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BLAST_COLUMNS} FROM blast_jobs
                 WHERE tenant_id = ?1 ORDER BY started_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![tenant_id, limit], row_to_blast)?;
            let mut blasts = Vec::new();
            for row in rows {
                blasts.push(row?);
            }
            Ok(blasts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
