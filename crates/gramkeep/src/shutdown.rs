// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process shutdown signal plumbing.
//!
//! A background task waits for SIGINT or SIGTERM and cancels a shared
//! [`CancellationToken`]. The MCP server and the sync worker both watch
//! the token; neither ever touches signal APIs directly.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Spawn the signal watcher and hand back the token it will cancel.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let signal_name = wait_for_termination_signal().await;
        info!(signal = signal_name, "shutdown requested");
        trigger.cancel();
    });

    token
}

/// Block until the process receives a termination signal, returning its
/// name for logging.
#[cfg(unix)]
async fn wait_for_termination_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            // Without a SIGTERM stream we can still honor Ctrl+C.
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
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
async fn wait_for_termination_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "Ctrl+C"
}
