// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for the archive database.

use gramkeep_core::ArchivedMessage;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle state of a sync job.
///
/// `pending` and `in_progress` jobs are picked up by the worker loop;
/// `idle` means the archive is caught up and backfilled to target;
/// `error` jobs wait for a fresh schedule before being retried.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Idle,
    Error,
}

/// One archiving job, one row per channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncJob {
    pub id: i64,
    /// Stringified marked peer id.
    pub channel_id: String,
    pub peer_title: String,
    pub peer_type: String,
    pub status: JobStatus,
    /// Highest archived message id; 0 until the first sync.
    pub last_message_id: i64,
    /// Lowest archived message id, once backfill has started.
    pub oldest_message_id: Option<i64>,
    /// Backfill depth this job aims for.
    pub target_message_count: i64,
    /// Cached archive size for this channel.
    pub message_count: i64,
    pub last_synced_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub error: Option<String>,
}

/// A message row as stored in the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub channel_id: String,
    pub message_id: i64,
    /// Unix seconds.
    pub date: Option<i64>,
    pub from_id: Option<String>,
    pub text: Option<String>,
    pub raw_json: String,
    pub created_at: String,
}

/// A message about to be inserted (no `created_at` yet).
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub channel_id: String,
    pub message_id: i64,
    pub date: Option<i64>,
    pub from_id: Option<String>,
    pub text: Option<String>,
    pub raw_json: String,
}

impl NewMessage {
    /// Build an insertable row from a normalized gateway message.
    pub fn from_archived(channel_id: &str, msg: &ArchivedMessage) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            message_id: msg.id,
            date: msg.date,
            from_id: Some(msg.from_id.clone()),
            text: (!msg.text.is_empty()).then(|| msg.text.clone()),
            raw_json: msg.raw.to_string(),
        }
    }
}

/// Aggregate statistics over one channel's archive.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStats {
    pub total: i64,
    pub min_id: Option<i64>,
    pub max_id: Option<i64>,
    pub min_date: Option<i64>,
    pub max_date: Option<i64>,
}

/// The full progress snapshot persisted when a job finishes a pass.
#[derive(Debug, Clone)]
pub struct JobFinalize {
    pub peer_title: String,
    pub peer_type: String,
    pub status: JobStatus,
    pub last_message_id: i64,
    pub oldest_message_id: Option<i64>,
    pub message_count: i64,
    pub target_message_count: i64,
}
