// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection MCP sessions.
//!
//! A session is created by the first `initialize` request on a connection
//! and addressed thereafter through the `mcp-session-id` header. Sessions
//! are in-memory only; they die with the process or an explicit DELETE.

use dashmap::DashMap;
use tracing::debug;

/// Protocol revisions this server accepts from clients.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// Revision offered when the client requests an unknown one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

/// One connected agent.
#[derive(Debug, Clone)]
pub struct McpSession {
    pub id: String,
    pub protocol_version: String,
    /// RFC 3339 timestamp of the `initialize` that opened the session.
    pub created_at: String,
}

/// Concurrent registry of live sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, McpSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for a client that requested `protocol_version`.
    ///
    /// Unknown versions are negotiated down to [`DEFAULT_PROTOCOL_VERSION`].
    pub fn create(&self, protocol_version: Option<&str>) -> McpSession {
        let version = match protocol_version {
            Some(v) if SUPPORTED_PROTOCOL_VERSIONS.contains(&v) => v.to_string(),
            _ => DEFAULT_PROTOCOL_VERSION.to_string(),
        };
        let session = McpSession {
            id: uuid::Uuid::new_v4().to_string(),
            protocol_version: version,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        debug!(session_id = %session.id, version = %session.protocol_version, "session created");
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<McpSession> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Drop a session; returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!(session_id = %id, "session closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
