// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The archive store facade.
//!
//! Wraps a [`Database`] handle and delegates to the typed query modules.
//! The sync worker writes through this; tool handlers only read.

use std::path::Path;

use gramkeep_core::GramkeepError;
use tracing::debug;

use crate::database::Database;
use crate::models::{JobFinalize, JobStatus, MessageStats, NewMessage, StoredMessage, SyncJob};
use crate::queries;

/// Typed access to the `jobs` and `messages` tables.
pub struct ArchiveStore {
    db: Database,
}

impl ArchiveStore {
    /// Open the archive at `path`, running migrations as needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, GramkeepError> {
        let db = Database::open(path).await?;
        Ok(Self { db })
    }

    /// Checkpoint and close the database.
    pub async fn close(&self) -> Result<(), GramkeepError> {
        self.db.close().await?;
        debug!("archive store closed");
        Ok(())
    }

    // --- Job operations ---

    /// Insert or re-queue the job for a channel; see [`queries::jobs::upsert_job`].
    pub async fn upsert_job(
        &self,
        channel_id: &str,
        peer_title: &str,
        peer_type: &str,
        target_message_count: i64,
    ) -> Result<SyncJob, GramkeepError> {
        queries::jobs::upsert_job(&self.db, channel_id, peer_title, peer_type, target_message_count)
            .await
    }

    pub async fn get_job(&self, channel_id: &str) -> Result<Option<SyncJob>, GramkeepError> {
        queries::jobs::get_job(&self.db, channel_id).await
    }

    pub async fn list_jobs(&self) -> Result<Vec<SyncJob>, GramkeepError> {
        queries::jobs::list_jobs(&self.db).await
    }

    pub async fn next_job(&self) -> Result<Option<SyncJob>, GramkeepError> {
        queries::jobs::next_job(&self.db).await
    }

    pub async fn mark_status(
        &self,
        id: i64,
        status: JobStatus,
        error: Option<String>,
    ) -> Result<(), GramkeepError> {
        queries::jobs::mark_status(&self.db, id, status, error).await
    }

    pub async fn finalize_job(
        &self,
        id: i64,
        progress: &JobFinalize,
    ) -> Result<(), GramkeepError> {
        queries::jobs::finalize_job(&self.db, id, progress).await
    }

    // --- Message operations ---

    pub async fn insert_messages(&self, records: &[NewMessage]) -> Result<usize, GramkeepError> {
        queries::messages::insert_messages(&self.db, records).await
    }

    pub async fn count_messages(&self, channel_id: &str) -> Result<i64, GramkeepError> {
        queries::messages::count_messages(&self.db, channel_id).await
    }

    pub async fn message_stats(&self, channel_id: &str) -> Result<MessageStats, GramkeepError> {
        queries::messages::message_stats(&self.db, channel_id).await
    }

    pub async fn search_messages(
        &self,
        channel_id: &str,
        pattern: &str,
        limit: usize,
        case_insensitive: bool,
    ) -> Result<Vec<StoredMessage>, GramkeepError> {
        queries::messages::search_messages(&self.db, channel_id, pattern, limit, case_insensitive)
            .await
    }
}
