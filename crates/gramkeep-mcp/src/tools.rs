// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The five Telegram tools.
//!
//! Every tool validates its parameters, probes authorization, then works
//! against the dialog index, the gateway, or the archive. Payloads are
//! camelCase JSON; the transport wraps them in a single `text` content
//! item.

use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use gramkeep_core::{GramkeepError, HistoryRequest, PeerInfo, PeerSelector, TelegramGateway};
use gramkeep_storage::ArchiveStore;
use gramkeep_sync::SyncWorker;
use gramkeep_telegram::DialogDirectory;

const DEFAULT_LIST_LIMIT: usize = 50;
const DEFAULT_SEARCH_LIMIT: usize = 100;
const DEFAULT_MESSAGE_LIMIT: usize = 100;
const DEFAULT_SYNC_DEPTH: i64 = 1000;
const MAX_SYNC_DEPTH: i64 = 50_000;

/// A tool as advertised in `tools/list`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Dispatches tool calls against the live gateway, index, and archive.
pub struct ToolDispatcher {
    gateway: Arc<dyn TelegramGateway>,
    directory: Arc<DialogDirectory>,
    store: Arc<ArchiveStore>,
    worker: Arc<SyncWorker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListChannelsParams {
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchChannelsParams {
    keywords: String,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetChannelMessagesParams {
    channel_id: Value,
    limit: Option<i64>,
    filter_pattern: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleMessageSyncParams {
    channel_id: Value,
    depth: Option<i64>,
}

impl ToolDispatcher {
    pub fn new(
        gateway: Arc<dyn TelegramGateway>,
        directory: Arc<DialogDirectory>,
        store: Arc<ArchiveStore>,
        worker: Arc<SyncWorker>,
    ) -> Self {
        Self {
            gateway,
            directory,
            store,
            worker,
        }
    }

    /// The advertised tool catalog.
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "listChannels",
                description: "List the account's dialogs (channels, groups, and chats), most recently active first.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of dialogs to return (default 50)."
                        }
                    }
                }),
            },
            ToolDefinition {
                name: "searchChannels",
                description: "Search dialogs by title or username, case-insensitive substring match.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "keywords": {
                            "type": "string",
                            "description": "Substring to look for in titles and usernames."
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of results (default 100)."
                        }
                    },
                    "required": ["keywords"]
                }),
            },
            ToolDefinition {
                name: "getChannelMessages",
                description: "Fetch the latest messages of a channel directly from Telegram, optionally filtered by a regular expression.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "channelId": {
                            "description": "Numeric peer id or username (with or without @).",
                            "oneOf": [{"type": "integer"}, {"type": "string"}]
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of messages to fetch (default 100)."
                        },
                        "filterPattern": {
                            "type": "string",
                            "description": "Regular expression applied to message texts."
                        }
                    },
                    "required": ["channelId"]
                }),
            },
            ToolDefinition {
                name: "scheduleMessageSync",
                description: "Create or re-queue a background archiving job for a channel, backfilling to the requested depth.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "channelId": {
                            "description": "Numeric peer id or username (with or without @).",
                            "oneOf": [{"type": "integer"}, {"type": "string"}]
                        },
                        "depth": {
                            "type": "integer",
                            "description": "How many messages to keep archived (1-50000, default 1000)."
                        }
                    },
                    "required": ["channelId"]
                }),
            },
            ToolDefinition {
                name: "listMessageSyncJobs",
                description: "List all background archiving jobs with their progress.",
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
        ]
    }

    pub fn is_known(name: &str) -> bool {
        Self::definitions().iter().any(|d| d.name == name)
    }

    /// Run one tool call, returning its JSON payload.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<Value, GramkeepError> {
        self.ensure_authorized().await?;
        match name {
            "listChannels" => self.list_channels(arguments).await,
            "searchChannels" => self.search_channels(arguments).await,
            "getChannelMessages" => self.get_channel_messages(arguments).await,
            "scheduleMessageSync" => self.schedule_message_sync(arguments).await,
            "listMessageSyncJobs" => self.list_message_sync_jobs().await,
            other => Err(GramkeepError::InvalidArgument(format!(
                "unknown tool `{other}`"
            ))),
        }
    }

    async fn ensure_authorized(&self) -> Result<(), GramkeepError> {
        if self.gateway.is_authorized().await? {
            Ok(())
        } else {
            Err(GramkeepError::Unauthorized(
                "telegram session is not authorized; restart the server to log in".to_string(),
            ))
        }
    }

    async fn list_channels(&self, arguments: &Value) -> Result<Value, GramkeepError> {
        let params: ListChannelsParams = parse_params(arguments)?;
        let limit = positive_limit(params.limit, DEFAULT_LIST_LIMIT)?;
        let channels = self.directory.list(limit).await;
        to_payload(&channels)
    }

    async fn search_channels(&self, arguments: &Value) -> Result<Value, GramkeepError> {
        let params: SearchChannelsParams = parse_params(arguments)?;
        if params.keywords.trim().is_empty() {
            return Err(GramkeepError::InvalidArgument(
                "keywords must be a non-empty string".to_string(),
            ));
        }
        let limit = positive_limit(params.limit, DEFAULT_SEARCH_LIMIT)?;
        let hits = self.directory.search(params.keywords.trim(), limit).await;
        to_payload(&hits)
    }

    async fn get_channel_messages(&self, arguments: &Value) -> Result<Value, GramkeepError> {
        let params: GetChannelMessagesParams = parse_params(arguments)?;
        let limit = positive_limit(params.limit, DEFAULT_MESSAGE_LIMIT)?;
        let filter = params
            .filter_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| GramkeepError::InvalidArgument(format!("invalid filterPattern: {e}")))?;

        let selector = PeerSelector::from_value(&params.channel_id)?;
        let peer = self.resolve(&selector).await?;
        let history = self
            .gateway
            .fetch_history(&PeerSelector::Id(peer.id), HistoryRequest::latest(limit))
            .await?;

        let total_fetched = history.len();
        let messages: Vec<_> = match &filter {
            Some(re) => history.into_iter().filter(|m| re.is_match(&m.text)).collect(),
            None => history,
        };

        Ok(json!({
            "peerTitle": peer.title,
            "totalFetched": total_fetched,
            "returned": messages.len(),
            "messages": messages,
        }))
    }

    async fn schedule_message_sync(&self, arguments: &Value) -> Result<Value, GramkeepError> {
        let params: ScheduleMessageSyncParams = parse_params(arguments)?;
        let depth = params.depth.unwrap_or(DEFAULT_SYNC_DEPTH);
        if !(1..=MAX_SYNC_DEPTH).contains(&depth) {
            return Err(GramkeepError::InvalidArgument(format!(
                "depth must be between 1 and {MAX_SYNC_DEPTH}, got {depth}"
            )));
        }

        let selector = PeerSelector::from_value(&params.channel_id)?;
        let peer = self.resolve(&selector).await?;
        let job = self
            .store
            .upsert_job(
                &peer.id.to_string(),
                &peer.title,
                &peer.kind.to_string(),
                depth,
            )
            .await?;
        info!(channel = %job.channel_id, depth, "sync job scheduled");
        self.worker.clone().resume();
        to_payload(&job)
    }

    async fn list_message_sync_jobs(&self) -> Result<Value, GramkeepError> {
        let jobs = self.store.list_jobs().await?;
        to_payload(&jobs)
    }

    /// Resolve a selector, falling back through the dialog index.
    ///
    /// A numeric id unknown to the gateway's peer cache triggers one index
    /// refresh (which re-warms the cache); if the id is still unknown the
    /// entry's username is used for a server-side lookup.
    async fn resolve(&self, selector: &PeerSelector) -> Result<PeerInfo, GramkeepError> {
        match selector {
            PeerSelector::Username(_) => self.gateway.resolve_peer(selector).await,
            PeerSelector::Id(id) => match self.gateway.resolve_peer(selector).await {
                Ok(info) => Ok(info),
                Err(GramkeepError::NotFound(_)) => {
                    let entry = self.directory.get(*id).await?;
                    match self.gateway.resolve_peer(selector).await {
                        Ok(info) => Ok(info),
                        Err(GramkeepError::NotFound(_)) => match &entry.username {
                            Some(username) => {
                                self.gateway
                                    .resolve_peer(&PeerSelector::Username(username.clone()))
                                    .await
                            }
                            None => Err(GramkeepError::NotFound(format!(
                                "peer {id} cannot be resolved for history access"
                            ))),
                        },
                        Err(e) => Err(e),
                    }
                }
                Err(e) => Err(e),
            },
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(arguments: &Value) -> Result<T, GramkeepError> {
    let value = match arguments {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(value).map_err(|e| GramkeepError::InvalidArgument(e.to_string()))
}

fn positive_limit(limit: Option<i64>, default: usize) -> Result<usize, GramkeepError> {
    match limit {
        None => Ok(default),
        Some(n) if n > 0 => Ok(n as usize),
        Some(n) => Err(GramkeepError::InvalidArgument(format!(
            "limit must be a positive integer, got {n}"
        ))),
    }
}

fn to_payload<T: serde::Serialize>(value: &T) -> Result<Value, GramkeepError> {
    serde_json::to_value(value).map_err(|e| GramkeepError::Internal(e.to_string()))
}
