// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant session row operations.

use hantar_core::HantarError;
use hantar_core::types::DeviceInfo;
use rusqlite::params;

use crate::database::Database;
use crate::models::SessionRecord;

/// Insert or replace a tenant's persisted session state.
pub async fn upsert_session(db: &Database, record: &SessionRecord) -> Result<(), HantarError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tenant_sessions
                     (tenant_id, is_connected, device_name, phone_number,
                      last_connected_at, contacts, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(tenant_id) DO UPDATE SET
                     is_connected = excluded.is_connected,
                     device_name = excluded.device_name,
                     phone_number = excluded.phone_number,
                     last_connected_at = excluded.last_connected_at,
                     contacts = excluded.contacts,
                     updated_at = excluded.updated_at",
                params![
                    record.tenant_id,
                    record.is_connected,
                    record.device_name,
                    record.phone_number,
                    record.last_connected_at,
                    record.contacts,
                    record.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a tenant's session row, if one exists.
pub async fn get_session(
    db: &Database,
    tenant_id: &str,
) -> Result<Option<SessionRecord>, HantarError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT tenant_id, is_connected, device_name, phone_number,
                        last_connected_at, contacts, updated_at
                 FROM tenant_sessions WHERE tenant_id = ?1",
            )?;
            let result = stmt.query_row(params![tenant_id], |row| {
                Ok(SessionRecord {
                    tenant_id: row.get(0)?,
                    is_connected: row.get(1)?,
                    device_name: row.get(2)?,
                    phone_number: row.get(3)?,
                    last_connected_at: row.get(4)?,
                    contacts: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            });
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Flip the connected flag. On connect, device metadata and the
/// last-connected timestamp are recorded; the row is created if missing.
pub async fn set_session_connected(
    db: &Database,
    tenant_id: &str,
    connected: bool,
    info: Option<&DeviceInfo>,
) -> Result<(), HantarError> {
    let tenant_id = tenant_id.to_string();
    let info = info.cloned();
    db.connection()
        .call(move |conn| {
            if connected {
                let info = info.unwrap_or_default();
                conn.execute(
                    "INSERT INTO tenant_sessions
                         (tenant_id, is_connected, device_name, phone_number,
                          last_connected_at, updated_at)
                     VALUES (?1, 1, ?2, ?3,
                             strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                             strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                     ON CONFLICT(tenant_id) DO UPDATE SET
                         is_connected = 1,
                         device_name = excluded.device_name,
                         phone_number = excluded.phone_number,
                         last_connected_at = excluded.last_connected_at,
                         updated_at = excluded.updated_at",
                    params![tenant_id, info.device_name, info.phone_number],
                )?;
            } else {
                conn.execute(
                    "UPDATE tenant_sessions
                     SET is_connected = 0,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE tenant_id = ?1",
                    params![tenant_id],
                )?;
            }
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace the tenant's contact snapshot. A snapshot for an unpaired
/// tenant creates the row so the contacts survive a restart.
pub async fn save_contacts(
    db: &Database,
    tenant_id: &str,
    contacts_json: &str,
) -> Result<(), HantarError> {
    let tenant_id = tenant_id.to_string();
    let contacts_json = contacts_json.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tenant_sessions (tenant_id, is_connected, contacts, updated_at)
                 VALUES (?1, 0, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(tenant_id) DO UPDATE SET
                     contacts = excluded.contacts,
                     updated_at = excluded.updated_at",
                params![tenant_id, contacts_json],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Crash recovery: mark every session row disconnected. Returns the
/// number of rows touched.
pub async fn mark_all_disconnected(db: &Database) -> Result<u64, HantarError> {
    db.connection()
        .call(|conn| {
            let touched = conn.execute(
                "UPDATE tenant_sessions
                 SET is_connected = 0,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE is_connected = 1",
                [],
            )?;
            Ok(touched as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
