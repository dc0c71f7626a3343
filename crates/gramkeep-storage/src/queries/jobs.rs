// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync job CRUD operations.

use std::str::FromStr;

use gramkeep_core::GramkeepError;
use rusqlite::{params, Row};

use crate::database::Database;
use crate::models::{JobFinalize, JobStatus, SyncJob};

const JOB_COLUMNS: &str = "id, channel_id, peer_title, peer_type, status, last_message_id, \
     oldest_message_id, target_message_count, message_count, last_synced_at, \
     created_at, updated_at, error";

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<SyncJob> {
    let status: String = row.get(4)?;
    let status = JobStatus::from_str(&status).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(SyncJob {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        peer_title: row.get(2)?,
        peer_type: row.get(3)?,
        status,
        last_message_id: row.get(5)?,
        oldest_message_id: row.get(6)?,
        target_message_count: row.get(7)?,
        message_count: row.get(8)?,
        last_synced_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        error: row.get(12)?,
    })
}

/// Insert or re-queue the job for a channel.
///
/// Resets status to `pending`, clears any recorded error, and updates the
/// backfill target and peer metadata. Returns the resulting row.
pub async fn upsert_job(
    db: &Database,
    channel_id: &str,
    peer_title: &str,
    peer_type: &str,
    target_message_count: i64,
) -> Result<SyncJob, GramkeepError> {
    let channel_id = channel_id.to_string();
    let peer_title = peer_title.to_string();
    let peer_type = peer_type.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO jobs (channel_id, peer_title, peer_type, status, target_message_count)
                 VALUES (?1, ?2, ?3, 'pending', ?4)
                 ON CONFLICT(channel_id) DO UPDATE SET
                     status = 'pending',
                     error = NULL,
                     peer_title = excluded.peer_title,
                     peer_type = excluded.peer_type,
                     target_message_count = excluded.target_message_count,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![channel_id, peer_title, peer_type, target_message_count],
            )?;
            let job = conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE channel_id = ?1"),
                params![channel_id],
                job_from_row,
            )?;
            Ok(job)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one job by channel id.
pub async fn get_job(db: &Database, channel_id: &str) -> Result<Option<SyncJob>, GramkeepError> {
    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE channel_id = ?1"),
                params![channel_id],
                job_from_row,
            );
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All jobs, most recently touched first.
pub async fn list_jobs(db: &Database) -> Result<Vec<SyncJob>, GramkeepError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {JOB_COLUMNS} FROM jobs ORDER BY updated_at DESC, id DESC"
                ))?;
            let rows = stmt.query_map([], job_from_row)?;
            let mut jobs = Vec::new();
            for row in rows {
                jobs.push(row?);
            }
            Ok(jobs)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The next job the worker should process: oldest waiting first.
pub async fn next_job(db: &Database) -> Result<Option<SyncJob>, GramkeepError> {
    db.connection()
        .call(|conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {JOB_COLUMNS} FROM jobs
                     WHERE status IN ('pending', 'in_progress')
                     ORDER BY updated_at ASC, id ASC
                     LIMIT 1"
                ),
                [],
                job_from_row,
            );
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set a job's status and error text.
pub async fn mark_status(
    db: &Database,
    id: i64,
    status: JobStatus,
    error: Option<String>,
) -> Result<(), GramkeepError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE jobs SET status = ?1, error = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![status, error, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist the full progress snapshot at the end of a sync pass.
///
/// Clears the error and stamps `last_synced_at`.
pub async fn finalize_job(
    db: &Database,
    id: i64,
    progress: &JobFinalize,
) -> Result<(), GramkeepError> {
    let progress = progress.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE jobs SET
                     peer_title = ?1,
                     peer_type = ?2,
                     status = ?3,
                     last_message_id = ?4,
                     oldest_message_id = ?5,
                     message_count = ?6,
                     target_message_count = ?7,
                     last_synced_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     error = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?8",
                params![
                    progress.peer_title,
                    progress.peer_type,
                    progress.status.to_string(),
                    progress.last_message_id,
                    progress.oldest_message_id,
                    progress.message_count,
                    progress.target_message_count,
                    id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
