// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full gramkeep stack against a temp SQLite
//! archive and a scripted [`MockGateway`]: dialog directory, sync worker,
//! tool dispatcher, and MCP session registry. Tests drive it either
//! through `call_tool` or through an axum router from `router()`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use gramkeep_config::SyncConfig;
use gramkeep_core::{ArchivedMessage, GramkeepError, PeerInfo};
use gramkeep_mcp::{build_router, McpServerState, SessionRegistry, ToolDispatcher};
use gramkeep_storage::{ArchiveStore, JobStatus, SyncJob};
use gramkeep_sync::SyncWorker;
use gramkeep_telegram::DialogDirectory;

use crate::mock_gateway::MockGateway;

/// Builder for assembling a test environment.
pub struct TestHarnessBuilder {
    dialogs: Vec<PeerInfo>,
    histories: Vec<(i64, Vec<ArchivedMessage>)>,
    sync_config: SyncConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            dialogs: Vec::new(),
            histories: Vec::new(),
            // Zero delays: tests should not wait on pacing sleeps.
            sync_config: SyncConfig {
                batch_size: 100,
                inter_job_delay_secs: 0,
                inter_batch_delay_ms: 0,
            },
        }
    }

    /// Register a dialog in the mock account.
    pub fn with_dialog(mut self, info: PeerInfo) -> Self {
        self.dialogs.push(info);
        self
    }

    /// Script a channel's history (any order; stored ascending).
    pub fn with_history(mut self, channel_id: i64, messages: Vec<ArchivedMessage>) -> Self {
        self.histories.push((channel_id, messages));
        self
    }

    /// Override the worker pacing/batching.
    pub fn with_sync_config(mut self, config: SyncConfig) -> Self {
        self.sync_config = config;
        self
    }

    /// Build the harness, initializing the dialog index.
    pub async fn build(self) -> Result<TestHarness, GramkeepError> {
        let temp_dir = tempfile::tempdir().map_err(GramkeepError::storage)?;
        let store = Arc::new(ArchiveStore::open(temp_dir.path().join("archive.db")).await?);

        let gateway = Arc::new(MockGateway::new());
        for dialog in self.dialogs {
            gateway.add_dialog(dialog).await;
        }
        for (channel_id, messages) in self.histories {
            gateway.set_history(channel_id, messages).await;
        }

        let directory = Arc::new(DialogDirectory::new(gateway.clone()));
        directory.initialize().await?;

        let cancel = CancellationToken::new();
        let worker = Arc::new(SyncWorker::new(
            store.clone(),
            gateway.clone(),
            self.sync_config,
            cancel.child_token(),
        ));
        let dispatcher = Arc::new(ToolDispatcher::new(
            gateway.clone(),
            directory.clone(),
            store.clone(),
            worker.clone(),
        ));
        let sessions = Arc::new(SessionRegistry::new());

        Ok(TestHarness {
            _temp_dir: temp_dir,
            store,
            gateway,
            directory,
            worker,
            dispatcher,
            sessions,
            cancel,
        })
    }
}

/// A complete gramkeep stack over mocks, torn down with the temp dir.
pub struct TestHarness {
    _temp_dir: tempfile::TempDir,
    pub store: Arc<ArchiveStore>,
    pub gateway: Arc<MockGateway>,
    pub directory: Arc<DialogDirectory>,
    pub worker: Arc<SyncWorker>,
    pub dispatcher: Arc<ToolDispatcher>,
    pub sessions: Arc<SessionRegistry>,
    pub cancel: CancellationToken,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A fresh MCP router over this harness's shared state.
    pub fn router(&self) -> axum::Router {
        build_router(McpServerState {
            sessions: self.sessions.clone(),
            dispatcher: self.dispatcher.clone(),
        })
    }

    /// Call a tool directly through the dispatcher.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, GramkeepError> {
        self.dispatcher.call(name, &arguments).await
    }

    /// Kick the worker and wait until every job has settled (idle or
    /// error) and the loop has parked.
    pub async fn run_worker_until_settled(
        &self,
        timeout: Duration,
    ) -> Result<Vec<SyncJob>, GramkeepError> {
        self.worker.clone().resume();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let jobs = self.store.list_jobs().await?;
            let settled = jobs
                .iter()
                .all(|j| matches!(j.status, JobStatus::Idle | JobStatus::Error));
            if settled && !self.worker.is_processing() {
                return Ok(jobs);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(GramkeepError::Internal(format!(
                    "worker did not settle within {timeout:?}: {jobs:?}"
                )));
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Stop the worker and close the archive.
    pub async fn shutdown(&self) -> Result<(), GramkeepError> {
        self.worker.shutdown().await;
        self.store.close().await
    }
}
