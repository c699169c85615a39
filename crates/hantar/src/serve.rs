// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hantar serve` command implementation.
//!
//! Wires the SQLite store, transport factory, session registry, blast
//! pipeline, and HTTP gateway together, then serves until SIGINT/SIGTERM
//! and drains live device sessions on the way out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use hantar_config::model::HantarConfig;
use hantar_core::error::HantarError;
use hantar_core::{DeviceTransportFactory, RecordStore};
use hantar_engine::{BlastPipeline, LoopbackFactory, SessionRegistry, shutdown};
use hantar_gateway::{GatewayState, ServerConfig, start_server};
use hantar_storage::SqliteStore;

/// Runs the `hantar serve` command.
pub async fn run_serve(config: HantarConfig) -> Result<(), HantarError> {
    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, "starting hantar serve");

    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;

    // Crash recovery: rows still flagged connected belong to a previous
    // process; no live session backs them now.
    let stale = store.mark_all_disconnected().await?;
    if stale > 0 {
        info!(count = stale, "marked stale sessions disconnected");
    }

    let factory = transport_factory(&config)?;
    let record_store: Arc<dyn RecordStore> = store.clone();

    let registry = Arc::new(SessionRegistry::new(
        factory,
        record_store.clone(),
        PathBuf::from(&config.credentials.dir),
        Duration::from_secs(config.timing.reconnect_delay_secs),
    ));
    let pipeline = Arc::new(BlastPipeline::new(
        registry.clone(),
        record_store.clone(),
        Duration::from_secs(config.timing.message_gap_secs),
    ));

    let shutdown_token = shutdown::install_signal_handler();

    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    let state = GatewayState {
        registry: registry.clone(),
        pipeline,
        store: record_store,
        qr_wait: Duration::from_secs(config.timing.qr_wait_secs),
        history_page_size: i64::from(config.gateway.history_page_size),
    };

    // Serves until the shutdown token is cancelled.
    start_server(&server_config, state, shutdown_token).await?;

    shutdown::drain(&registry).await;
    store.close().await?;
    info!("shutdown complete");
    Ok(())
}

fn transport_factory(
    config: &HantarConfig,
) -> Result<Arc<dyn DeviceTransportFactory>, HantarError> {
    match config.transport.kind.as_str() {
        "loopback" => Ok(Arc::new(LoopbackFactory)),
        other => Err(HantarError::Config(format!(
            "unknown transport kind `{other}`"
        ))),
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hantar={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
