// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway. Handlers
//! carry no business logic of their own; they validate input, call into
//! the session registry and blast pipeline, and translate to JSON.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use hantar_core::{HantarError, RecordStore};
use hantar_engine::{BlastPipeline, SessionRegistry};

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub registry: Arc<SessionRegistry>,
    pub pipeline: Arc<BlastPipeline>,
    pub store: Arc<dyn RecordStore>,
    /// How long the connect endpoint waits for a pairing code.
    pub qr_wait: Duration,
    /// Cap on the blast history page.
    pub history_page_size: i64,
}

/// Gateway server configuration (mirrors GatewayConfig from hantar-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the gateway router. Separated from [`start_server`] so tests can
/// drive it without binding a socket.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/connect", post(handlers::post_connect))
        .route("/qr/{tenant_id}", get(handlers::get_qr))
        .route("/status/{tenant_id}", get(handlers::get_status))
        .route("/disconnect", post(handlers::post_disconnect))
        .route("/contacts/{tenant_id}", get(handlers::get_contacts))
        .route("/send-blast", post(handlers::post_send_blast))
        .route("/blast-history/{tenant_id}", get(handlers::get_blast_history))
        .route("/blast-progress/{blast_id}", get(handlers::get_blast_progress))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Binds to the configured host:port and serves until `shutdown` is
/// cancelled, then finishes in-flight requests and returns.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), HantarError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HantarError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| HantarError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3001,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }
}
