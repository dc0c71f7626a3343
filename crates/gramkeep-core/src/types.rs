// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common value types shared by the gateway, archiver, and tool server.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What kind of dialog a peer is, from the user's point of view.
///
/// `Channel` covers both broadcast channels and supergroups (they share the
/// same peer namespace); `Chat` is a small legacy group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PeerKind {
    User,
    Channel,
    Chat,
}

/// A resolved peer as exposed in tool results and kept in the dialog index.
///
/// `id` is the canonical signed ("marked") Telegram id: users keep their
/// positive id, small groups are negated, and channels/supergroups carry the
/// `-100...` prefix. Two `PeerInfo` values describe the same peer iff their
/// ids are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub id: i64,
    pub kind: PeerKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl PartialEq for PeerInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PeerInfo {}

/// A message after normalization by the gateway.
///
/// Downstream code (archiver, tools) sees only this record, never the
/// library's message object. `from_id` is the stringified sender id, or
/// `"unknown"` when the sender is unavailable. `raw` holds the serialized
/// form persisted in the archive's `raw_json` column and is not part of the
/// tool wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedMessage {
    pub id: i64,
    /// Unix seconds, when the library reports a date.
    pub date: Option<i64>,
    pub text: String,
    pub from_id: String,
    #[serde(rename = "peerType")]
    pub peer_kind: PeerKind,
    pub peer_id: i64,
    #[serde(skip)]
    pub raw: serde_json::Value,
}

/// Controls for one history fetch.
///
/// Pages are always returned newest-first; the sync worker re-sorts as it
/// needs. `offset_id` starts the backward cursor exclusively at that
/// message; `min_id` keeps only ids strictly greater than the bound (the
/// fetch stops early once reached); `max_id` drops ids at or above the
/// bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryRequest {
    pub limit: usize,
    pub offset_id: Option<i64>,
    pub min_id: Option<i64>,
    pub max_id: Option<i64>,
}

impl HistoryRequest {
    /// A plain "latest N messages" request.
    pub fn latest(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}
