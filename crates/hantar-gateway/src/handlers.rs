// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Wire format is camelCase JSON. Error translation follows one rule:
//! validation and not-connected map to 400, missing entities to 404,
//! everything else to 500 with a human-readable message.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use hantar_core::HantarError;
use hantar_core::types::{BlastRecord, BlastStatus, Contact, DeviceInfo, TenantId};
use hantar_engine::SessionSnapshot;

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(e: HantarError) -> Response {
    let status = match &e {
        HantarError::Validation(_) | HantarError::NotConnected { .. } => StatusCode::BAD_REQUEST,
        HantarError::NotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Device metadata in wire format.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfoDto {
    pub device_name: Option<String>,
    pub phone_number: Option<String>,
}

impl From<DeviceInfo> for DeviceInfoDto {
    fn from(info: DeviceInfo) -> Self {
        Self {
            device_name: info.device_name,
            phone_number: info.phone_number,
        }
    }
}

/// Render a pairing code as an SVG image payload. Falls back to the raw
/// pairing string if the code cannot be encoded.
fn render_qr(code: &str) -> String {
    match qrcode::QrCode::new(code.as_bytes()) {
        Ok(qr) => qr
            .render::<qrcode::render::svg::Color>()
            .min_dimensions(240, 240)
            .build(),
        Err(_) => code.to_string(),
    }
}

// --- GET /health ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub active_connections: usize,
    pub connections: Vec<ConnectionInfo>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub tenant_id: String,
    pub is_authenticated: bool,
    pub device_name: Option<String>,
    pub phone_number: Option<String>,
}

impl From<SessionSnapshot> for ConnectionInfo {
    fn from(snap: SessionSnapshot) -> Self {
        let info = snap.device_info.unwrap_or_default();
        Self {
            tenant_id: snap.tenant_id,
            is_authenticated: snap.is_authenticated,
            device_name: info.device_name,
            phone_number: info.phone_number,
        }
    }
}

pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let connections: Vec<ConnectionInfo> = state
        .registry
        .snapshots()
        .into_iter()
        .map(ConnectionInfo::from)
        .collect();
    Json(HealthResponse {
        status: "ok".to_string(),
        active_connections: connections.len(),
        connections,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// --- POST /connect ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfoDto>,
}

/// Ensure a session exists, then wait briefly for the asynchronous
/// handshake to produce either an authenticated connection or a pairing
/// code. Neither arriving in time is not an error; the caller polls.
pub async fn post_connect(
    State(state): State<GatewayState>,
    Json(body): Json<ConnectRequest>,
) -> Response {
    let Some(tenant_id) = body.tenant_id.filter(|t| !t.trim().is_empty()) else {
        return bad_request("tenantId is required");
    };
    let tenant = TenantId::from(tenant_id.as_str());

    let session = match state.registry.ensure_session(&tenant) {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };

    // Skip the wait when a pairing code is already pending from an
    // earlier handshake.
    if !session.is_authenticated() && session.qr().is_none() {
        tokio::time::sleep(state.qr_wait).await;
    }

    let response = if session.is_authenticated() {
        ConnectResponse {
            status: "already_connected".to_string(),
            qr_code: None,
            device_info: session.device_info().map(DeviceInfoDto::from),
        }
    } else if let Some(code) = session.qr() {
        ConnectResponse {
            status: "qr_generated".to_string(),
            qr_code: Some(render_qr(&code)),
            device_info: None,
        }
    } else {
        ConnectResponse {
            status: "connecting".to_string(),
            qr_code: None,
            device_info: None,
        }
    };
    (StatusCode::OK, Json(response)).into_response()
}

// --- GET /qr/{tenant_id} ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrResponse {
    pub qr_code: String,
}

pub async fn get_qr(
    State(state): State<GatewayState>,
    Path(tenant_id): Path<String>,
) -> Response {
    match state.registry.qr(&TenantId::from(tenant_id.as_str())) {
        Some(code) => (
            StatusCode::OK,
            Json(QrResponse {
                qr_code: render_qr(&code),
            }),
        )
            .into_response(),
        None => error_response(HantarError::NotFound {
            what: "pairing code",
            id: tenant_id,
        }),
    }
}

// --- GET /status/{tenant_id} ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub is_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfoDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected: Option<String>,
    pub has_qr: bool,
}

/// Live state when a session exists; persisted last-known state otherwise.
pub async fn get_status(
    State(state): State<GatewayState>,
    Path(tenant_id): Path<String>,
) -> Response {
    let tenant = TenantId::from(tenant_id.as_str());

    if let Some(snap) = state.registry.status(&tenant) {
        let response = StatusResponse {
            is_connected: snap.is_authenticated,
            device_info: snap.device_info.map(DeviceInfoDto::from),
            last_connected: None,
            has_qr: snap.has_qr,
        };
        return (StatusCode::OK, Json(response)).into_response();
    }

    match state.store.get_session(&tenant_id).await {
        Ok(row) => {
            let response = StatusResponse {
                is_connected: false,
                device_info: None,
                last_connected: row.and_then(|r| r.last_connected_at),
                has_qr: false,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

// --- POST /disconnect ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
    pub message: String,
}

pub async fn post_disconnect(
    State(state): State<GatewayState>,
    Json(body): Json<DisconnectRequest>,
) -> Response {
    let Some(tenant_id) = body.tenant_id.filter(|t| !t.trim().is_empty()) else {
        return bad_request("tenantId is required");
    };

    match state
        .registry
        .disconnect(&TenantId::from(tenant_id.as_str()))
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(DisconnectResponse {
                success: true,
                message: format!("tenant {tenant_id} disconnected"),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

// --- GET /contacts/{tenant_id} ---

#[derive(Debug, Serialize)]
pub struct ContactsResponse {
    pub contacts: Vec<Contact>,
}

/// Serve the last contact snapshot the device pushed. No snapshot yet is
/// an empty list, not an error.
pub async fn get_contacts(
    State(state): State<GatewayState>,
    Path(tenant_id): Path<String>,
) -> Response {
    match state.store.get_session(&tenant_id).await {
        Ok(row) => {
            let contacts = row
                .and_then(|r| r.contacts)
                .and_then(|json| serde_json::from_str::<Vec<Contact>>(&json).ok())
                .unwrap_or_default();
            (StatusCode::OK, Json(ContactsResponse { contacts })).into_response()
        }
        Err(e) => error_response(e),
    }
}

// --- POST /send-blast ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBlastRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub recipients: Vec<RecipientDto>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecipientDto {
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBlastResponse {
    pub success: bool,
    pub blast_id: Option<String>,
    pub success_count: u32,
    pub fail_count: u32,
    pub errors: Vec<BlastErrorDto>,
}

#[derive(Debug, Serialize)]
pub struct BlastErrorDto {
    pub phone: String,
    pub error: String,
}

pub async fn post_send_blast(
    State(state): State<GatewayState>,
    Json(body): Json<SendBlastRequest>,
) -> Response {
    let Some(tenant_id) = body.tenant_id.filter(|t| !t.trim().is_empty()) else {
        return bad_request("tenantId is required");
    };
    let Some(message) = body.message else {
        return bad_request("message is required");
    };
    let recipients: Vec<hantar_core::types::Recipient> = body
        .recipients
        .into_iter()
        .map(|r| hantar_core::types::Recipient {
            phone: r.phone,
            name: r.name,
        })
        .collect();

    match state
        .pipeline
        .run(&TenantId::from(tenant_id.as_str()), &recipients, &message)
        .await
    {
        Ok(summary) => (
            StatusCode::OK,
            Json(SendBlastResponse {
                success: true,
                blast_id: summary.blast_id,
                success_count: summary.success_count,
                fail_count: summary.fail_count,
                errors: summary
                    .errors
                    .into_iter()
                    .map(|e| BlastErrorDto {
                        phone: e.phone,
                        error: e.error,
                    })
                    .collect(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

// --- GET /blast-history/{tenant_id} ---

#[derive(Debug, Serialize)]
pub struct BlastHistoryResponse {
    pub history: Vec<BlastJobDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlastJobDto {
    pub id: String,
    pub message: String,
    pub status: BlastStatus,
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
    pub errors: Vec<serde_json::Value>,
    pub started_at: String,
    pub completed_at: Option<String>,
}

impl From<BlastRecord> for BlastJobDto {
    fn from(record: BlastRecord) -> Self {
        let errors = serde_json::from_str(&record.errors).unwrap_or_default();
        Self {
            id: record.id,
            message: record.message,
            status: record.status,
            total: record.total,
            successful: record.successful,
            failed: record.failed,
            errors,
            started_at: record.started_at,
            completed_at: record.completed_at,
        }
    }
}

pub async fn get_blast_history(
    State(state): State<GatewayState>,
    Path(tenant_id): Path<String>,
) -> Response {
    match state
        .store
        .list_blasts(&tenant_id, state.history_page_size)
        .await
    {
        Ok(records) => (
            StatusCode::OK,
            Json(BlastHistoryResponse {
                history: records.into_iter().map(BlastJobDto::from).collect(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

// --- GET /blast-progress/{blast_id} ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlastProgressResponse {
    pub status: BlastStatus,
    pub successful_sends: i64,
    pub failed_sends: i64,
    pub total_recipients: i64,
    pub progress_percentage: u8,
}

pub async fn get_blast_progress(
    State(state): State<GatewayState>,
    Path(blast_id): Path<String>,
) -> Response {
    match state.pipeline.progress(&blast_id).await {
        Ok(progress) => (
            StatusCode::OK,
            Json(BlastProgressResponse {
                status: progress.status,
                successful_sends: progress.successful_sends,
                failed_sends: progress.failed_sends,
                total_recipients: progress.total_recipients,
                progress_percentage: progress.progress_percentage,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
