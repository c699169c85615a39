// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort persistence policy.
//!
//! Bookkeeping writes on the hot path (blast progress, message records,
//! session flags) must never block or fail the user-visible action. Every
//! such write goes through [`best_effort`], which logs the failure and
//! carries on. This is an availability-over-durability tradeoff: a blast
//! still runs to completion against a dead database.

use std::future::Future;

use hantar_core::HantarError;
use tracing::warn;

/// Await a persistence write, swallowing any error with a warning.
/// `what` names the write for the log line.
pub async fn best_effort<F>(what: &str, fut: F)
where
    F: Future<Output = Result<(), HantarError>>,
{
    if let Err(e) = fut.await {
        warn!(error = %e, "best-effort {what} write failed, continuing");
    }
}

/// Current time as an RFC 3339 UTC timestamp with millisecond precision,
/// the format every persisted timestamp column uses.
pub fn now_rfc3339() -> String {
    chrono::Utc::now()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
