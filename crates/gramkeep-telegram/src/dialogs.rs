// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory dialog index.
//!
//! Built once at startup from a full dialog enumeration and rebuilt on
//! demand when a requested peer is missing. Never persisted: a restart
//! always re-enumerates. Telegram returns dialogs most-recently-active
//! first and the index preserves that order.

use std::collections::HashMap;
use std::sync::Arc;

use gramkeep_core::{GramkeepError, PeerInfo, TelegramGateway};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Insertion-ordered mapping from marked peer id to peer info.
#[derive(Debug, Default)]
pub struct DialogIndex {
    order: Vec<i64>,
    by_id: HashMap<i64, PeerInfo>,
    by_username: HashMap<String, i64>,
}

impl DialogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed dialogs.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Add or replace an entry, preserving first-insertion order.
    pub fn insert(&mut self, info: PeerInfo) {
        if let Some(previous) = self.by_id.insert(info.id, info.clone()) {
            if let Some(old_username) = previous.username {
                self.by_username.remove(&old_username);
            }
        } else {
            self.order.push(info.id);
        }
        if let Some(username) = info.username {
            self.by_username.insert(username, info.id);
        }
    }

    /// First `limit` entries in insertion order.
    pub fn list(&self, limit: usize) -> Vec<PeerInfo> {
        self.order
            .iter()
            .take(limit)
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect()
    }

    /// Case-insensitive substring match over title and username.
    ///
    /// Scanning stops once `limit` hits are collected.
    pub fn search(&self, keyword: &str, limit: usize) -> Vec<PeerInfo> {
        let needle = keyword.to_lowercase();
        let mut hits = Vec::new();
        for id in &self.order {
            let Some(info) = self.by_id.get(id) else {
                continue;
            };
            let title_match = info.title.to_lowercase().contains(&needle);
            let username_match = info
                .username
                .as_deref()
                .is_some_and(|u| u.contains(&needle));
            if title_match || username_match {
                hits.push(info.clone());
                if hits.len() >= limit {
                    break;
                }
            }
        }
        hits
    }

    /// O(1) lookup by marked id.
    pub fn get(&self, id: i64) -> Option<&PeerInfo> {
        self.by_id.get(&id)
    }

    /// Lookup by lowercase username.
    pub fn get_by_username(&self, username: &str) -> Option<&PeerInfo> {
        self.by_username
            .get(username)
            .and_then(|id| self.by_id.get(id))
    }
}

/// The dialog index plus the machinery to (re)build it from the gateway.
///
/// Writers are serialized by the inner lock's write guard; only
/// `initialize` and the single-shot refresh inside `get` take it.
pub struct DialogDirectory {
    gateway: Arc<dyn TelegramGateway>,
    index: RwLock<DialogIndex>,
}

impl DialogDirectory {
    pub fn new(gateway: Arc<dyn TelegramGateway>) -> Self {
        Self {
            gateway,
            index: RwLock::new(DialogIndex::new()),
        }
    }

    /// Authenticate, then populate the index with one full enumeration.
    pub async fn initialize(&self) -> Result<usize, GramkeepError> {
        self.gateway.authenticate().await?;
        let count = self.refresh().await?;
        info!(dialogs = count, "dialog index initialized");
        Ok(count)
    }

    /// Rebuild the index from a fresh enumeration.
    pub async fn refresh(&self) -> Result<usize, GramkeepError> {
        let dialogs = self.gateway.list_dialogs().await?;
        let mut fresh = DialogIndex::new();
        for info in dialogs {
            fresh.insert(info);
        }
        let count = fresh.len();
        *self.index.write().await = fresh;
        debug!(dialogs = count, "dialog index refreshed");
        Ok(count)
    }

    /// First `limit` dialogs, most recently active first.
    pub async fn list(&self, limit: usize) -> Vec<PeerInfo> {
        self.index.read().await.list(limit)
    }

    /// Search titles and usernames, capped at `limit` hits.
    pub async fn search(&self, keyword: &str, limit: usize) -> Vec<PeerInfo> {
        self.index.read().await.search(keyword, limit)
    }

    /// Lookup by id, allowing one refresh on a miss.
    pub async fn get(&self, id: i64) -> Result<PeerInfo, GramkeepError> {
        if let Some(info) = self.index.read().await.get(id) {
            return Ok(info.clone());
        }
        self.refresh().await?;
        self.index
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| GramkeepError::NotFound(format!("peer {id} not found in dialogs")))
    }
}
