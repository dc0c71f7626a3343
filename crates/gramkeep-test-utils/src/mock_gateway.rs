// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock Telegram gateway for deterministic testing.
//!
//! Histories are scripted per channel as ascending id lists; fetches are
//! answered with the same newest-first paging semantics the real gateway
//! produces (`offset_id` exclusive backward cursor, `min_id` early stop,
//! `max_id` filter, `limit` cap). Errors can be queued to fail upcoming
//! fetches, and fetch concurrency is tracked so tests can assert the
//! single-writer property.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use gramkeep_core::{
    ArchivedMessage, GramkeepError, HistoryRequest, PeerInfo, PeerSelector, TelegramGateway,
};

/// A scriptable in-memory gateway.
#[derive(Default)]
pub struct MockGateway {
    dialogs: Mutex<Vec<PeerInfo>>,
    /// Marked peer id -> messages in ascending id order.
    histories: Mutex<HashMap<i64, Vec<ArchivedMessage>>>,
    /// Errors returned (in order) by upcoming `fetch_history` calls.
    fail_queue: Mutex<Vec<GramkeepError>>,
    authorized: AtomicBool,
    fetch_calls: AtomicUsize,
    active_fetches: AtomicUsize,
    max_concurrent_fetches: AtomicUsize,
    fetch_delay_ms: AtomicU64,
}

impl MockGateway {
    pub fn new() -> Self {
        let gateway = Self::default();
        gateway.authorized.store(true, Ordering::SeqCst);
        gateway
    }

    /// Register a dialog (also makes the peer resolvable).
    pub async fn add_dialog(&self, info: PeerInfo) {
        self.dialogs.lock().await.push(info);
    }

    /// Script a channel's full history; messages are kept ascending by id.
    pub async fn set_history(&self, channel_id: i64, mut messages: Vec<ArchivedMessage>) {
        messages.sort_by_key(|m| m.id);
        self.histories.lock().await.insert(channel_id, messages);
    }

    /// Append one message to a channel's history (as if it just arrived).
    pub async fn push_message(&self, channel_id: i64, message: ArchivedMessage) {
        let mut histories = self.histories.lock().await;
        let history = histories.entry(channel_id).or_default();
        history.push(message);
        history.sort_by_key(|m| m.id);
    }

    /// Queue an error for the next `fetch_history` call.
    pub async fn fail_next_fetch(&self, error: GramkeepError) {
        self.fail_queue.lock().await.push(error);
    }

    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }

    /// Artificial latency per fetch, for concurrency tests.
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.fetch_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Highest number of fetches ever observed in flight at once.
    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_concurrent_fetches.load(Ordering::SeqCst)
    }

    /// Convenience constructor for a scripted message.
    pub fn message(peer: &PeerInfo, id: i64, text: &str) -> ArchivedMessage {
        ArchivedMessage {
            id,
            date: Some(1_700_000_000 + id),
            text: text.to_string(),
            from_id: "4242".to_string(),
            peer_kind: peer.kind,
            peer_id: peer.id,
            raw: serde_json::json!({"id": id, "text": text}),
        }
    }

    async fn marked_id(&self, selector: &PeerSelector) -> Result<i64, GramkeepError> {
        match selector {
            PeerSelector::Id(id) => Ok(*id),
            PeerSelector::Username(username) => self
                .dialogs
                .lock()
                .await
                .iter()
                .find(|d| d.username.as_deref() == Some(username))
                .map(|d| d.id)
                .ok_or_else(|| {
                    GramkeepError::NotFound(format!("username @{username} not found"))
                }),
        }
    }
}

#[async_trait]
impl TelegramGateway for MockGateway {
    async fn authenticate(&self) -> Result<(), GramkeepError> {
        self.authorized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn is_authorized(&self) -> Result<bool, GramkeepError> {
        Ok(self.authorized.load(Ordering::SeqCst))
    }

    async fn list_dialogs(&self) -> Result<Vec<PeerInfo>, GramkeepError> {
        Ok(self.dialogs.lock().await.clone())
    }

    async fn resolve_peer(&self, selector: &PeerSelector) -> Result<PeerInfo, GramkeepError> {
        let id = self.marked_id(selector).await?;
        self.dialogs
            .lock()
            .await
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| GramkeepError::NotFound(format!("peer {id} is not in the peer cache")))
    }

    async fn fetch_history(
        &self,
        selector: &PeerSelector,
        request: HistoryRequest,
    ) -> Result<Vec<ArchivedMessage>, GramkeepError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        {
            let mut queue = self.fail_queue.lock().await;
            if !queue.is_empty() {
                return Err(queue.remove(0));
            }
        }

        let active = self.active_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_fetches
            .fetch_max(active, Ordering::SeqCst);

        let delay_ms = self.fetch_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        let result = self.page(selector, request).await;
        self.active_fetches.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl MockGateway {
    /// One newest-first page, mirroring the real gateway's cursor rules.
    async fn page(
        &self,
        selector: &PeerSelector,
        request: HistoryRequest,
    ) -> Result<Vec<ArchivedMessage>, GramkeepError> {
        let id = self.marked_id(selector).await?;
        let histories = self.histories.lock().await;
        let history = histories.get(&id).map(Vec::as_slice).unwrap_or_default();

        let mut page = Vec::new();
        for message in history.iter().rev() {
            if let Some(offset) = request.offset_id
                && message.id >= offset
            {
                continue;
            }
            if let Some(min) = request.min_id
                && message.id <= min
            {
                break;
            }
            if let Some(max) = request.max_id
                && message.id >= max
            {
                continue;
            }
            page.push(message.clone());
            if request.limit > 0 && page.len() >= request.limit {
                break;
            }
        }
        Ok(page)
    }
}
