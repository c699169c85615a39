// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shutdown signalling and the session drain.
//!
//! The serve loop runs until a [`CancellationToken`] fires; this module
//! wires SIGINT and SIGTERM to that token and logs out live device
//! sessions on the way down.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::registry::SessionRegistry;

/// Spawn a background task that cancels the returned token on the first
/// SIGINT or SIGTERM.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        let signal_name = wait_for_signal().await;
        info!(signal = signal_name, "shutdown signal received");
        trigger.cancel();
    });
    token
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "SIGTERM handler unavailable, falling back to Ctrl+C");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "Ctrl+C"
}

/// Log out every live session. Per-session failures are logged by the
/// registry and never block the rest of the drain.
pub async fn drain(registry: &SessionRegistry) {
    let count = registry.active_count();
    if count == 0 {
        info!("no live sessions to drain");
        return;
    }
    registry.drain().await;
    info!(count, "session drain complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_starts_uncancelled() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }
}
