// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `gramkeep serve` and `gramkeep login` command implementations.
//!
//! Startup order matters: archive first (cheap to fail), then the
//! Telegram session (may go interactive), then the dialog index, then the
//! worker and the MCP server. On SIGINT/SIGTERM the server stops
//! accepting, the worker drains its current job, and the archive is
//! checkpointed before exit.

use std::sync::Arc;

use tracing::info;

use gramkeep_config::{load_config, validate_config, GramkeepConfig};
use gramkeep_core::{GramkeepError, TelegramGateway};
use gramkeep_mcp::{McpServerState, SessionRegistry, ToolDispatcher};
use gramkeep_storage::ArchiveStore;
use gramkeep_sync::SyncWorker;
use gramkeep_telegram::{DialogDirectory, GrammersGateway, SessionBlobStore};

use crate::prompt::StdinPrompt;
use crate::shutdown;

/// Runs the `gramkeep serve` command.
pub async fn run_serve() -> Result<(), GramkeepError> {
    let config = load_and_validate()?;
    init_tracing(&config.log.level);
    info!("starting gramkeep serve");

    let store = Arc::new(ArchiveStore::open(config.storage.database_path()).await?);

    let gateway = connect_gateway(&config).await?;

    let directory = Arc::new(DialogDirectory::new(gateway.clone()));
    let dialogs = directory.initialize().await?;
    info!(dialogs, "telegram session ready");

    let cancel = shutdown::install_signal_handler();

    let worker = Arc::new(SyncWorker::new(
        store.clone(),
        gateway.clone(),
        config.sync.clone(),
        cancel.child_token(),
    ));
    // Pick up jobs left over from a previous run.
    worker.clone().resume();

    let dispatcher = Arc::new(ToolDispatcher::new(
        gateway.clone(),
        directory.clone(),
        store.clone(),
        worker.clone(),
    ));
    let state = McpServerState {
        sessions: Arc::new(SessionRegistry::new()),
        dispatcher,
    };

    gramkeep_mcp::serve(&config.server.host, config.server.port, state, cancel.clone()).await?;

    // The server has stopped accepting; drain the worker, then checkpoint.
    worker.shutdown().await;
    store.close().await?;
    info!("gramkeep serve shutdown complete");
    Ok(())
}

/// Runs the `gramkeep login` command: interactive auth only.
pub async fn run_login() -> Result<(), GramkeepError> {
    let config = load_and_validate()?;
    init_tracing(&config.log.level);

    let gateway = connect_gateway(&config).await?;
    gateway.authenticate().await?;
    println!(
        "Login successful. Session saved to {}",
        config.storage.session_path().display()
    );
    Ok(())
}

async fn connect_gateway(
    config: &GramkeepConfig,
) -> Result<Arc<dyn TelegramGateway>, GramkeepError> {
    let session_store = SessionBlobStore::new(config.storage.session_path());
    let gateway =
        GrammersGateway::connect(&config.telegram, session_store, Arc::new(StdinPrompt::new()))
            .await?;
    Ok(Arc::new(gateway))
}

fn load_and_validate() -> Result<GramkeepConfig, GramkeepError> {
    let config = load_config().map_err(|e| GramkeepError::Config(e.to_string()))?;
    validate_config(&config).map_err(|errors| {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        GramkeepError::Config(joined)
    })?;
    Ok(config)
}

/// Initializes the tracing subscriber with the configured log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gramkeep={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
