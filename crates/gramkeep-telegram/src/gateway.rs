// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! grammers-backed implementation of [`TelegramGateway`].
//!
//! One MTProto connection per process; grammers serializes all traffic on
//! it. The gateway keeps a packed-peer cache (warmed by dialog
//! enumeration) so history calls can address peers by id without a second
//! server round-trip. Access hashes never leave this module.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use grammers_client::types::Chat;
use grammers_client::{Client, Config, InitParams, InvocationError, SignInError};
use grammers_session::{PackedChat, Session};
use tracing::{debug, info, warn};

use gramkeep_config::TelegramConfig;
use gramkeep_core::error::flood_wait_seconds;
use gramkeep_core::{
    ArchivedMessage, AuthFailureReason, GramkeepError, HistoryRequest, LoginPrompt, PeerInfo,
    PeerSelector, TelegramGateway,
};

use crate::normalize;
use crate::session_store::SessionBlobStore;

#[derive(Clone)]
struct CachedPeer {
    packed: PackedChat,
    info: PeerInfo,
}

/// MTProto gateway over a persistent user session.
pub struct GrammersGateway {
    client: Client,
    store: SessionBlobStore,
    phone_number: String,
    prompt: Arc<dyn LoginPrompt>,
    /// Marked id -> packed peer + info, populated by dialog enumeration
    /// and username resolution.
    peers: DashMap<i64, CachedPeer>,
    usernames: DashMap<String, i64>,
}

impl GrammersGateway {
    /// Connect to Telegram, loading the persisted session blob if present.
    ///
    /// Connecting does not authenticate; call
    /// [`authenticate`](TelegramGateway::authenticate) before issuing
    /// requests.
    pub async fn connect(
        config: &TelegramConfig,
        store: SessionBlobStore,
        prompt: Arc<dyn LoginPrompt>,
    ) -> Result<Self, GramkeepError> {
        let session = if store.exists() {
            match Session::load(&store.read()?) {
                Ok(session) => session,
                Err(e) => {
                    warn!(error = %e, "session blob unreadable, starting fresh");
                    Session::new()
                }
            }
        } else {
            Session::new()
        };

        let client = Client::connect(Config {
            session,
            api_id: config.api_id,
            api_hash: config.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| GramkeepError::Transport {
            message: format!("failed to connect to Telegram: {e}"),
            source: Some(Box::new(e)),
        })?;

        info!("connected to Telegram");
        Ok(Self {
            client,
            store,
            phone_number: config.phone_number.clone(),
            prompt,
            peers: DashMap::new(),
            usernames: DashMap::new(),
        })
    }

    fn save_session(&self) -> Result<(), GramkeepError> {
        self.store.write(&self.client.session().save())
    }

    fn cache_chat(&self, chat: &Chat, info: PeerInfo) {
        if let Some(username) = &info.username {
            self.usernames.insert(username.clone(), info.id);
        }
        self.peers.insert(
            info.id,
            CachedPeer {
                packed: chat.pack(),
                info,
            },
        );
    }

    /// The packed peer (carrying the access hash) for a selector.
    async fn packed_peer(
        &self,
        selector: &PeerSelector,
    ) -> Result<(PackedChat, PeerInfo), GramkeepError> {
        match selector {
            PeerSelector::Id(id) => self
                .peers
                .get(id)
                .map(|entry| (entry.packed, entry.info.clone()))
                .ok_or_else(|| {
                    GramkeepError::NotFound(format!(
                        "peer {id} is not in the peer cache; resolve it by username or refresh dialogs"
                    ))
                }),
            PeerSelector::Username(_) => {
                let info = self.resolve_peer(selector).await?;
                let entry = self.peers.get(&info.id).ok_or_else(|| {
                    GramkeepError::Internal(format!("peer {} vanished from cache", info.id))
                })?;
                Ok((entry.packed, info))
            }
        }
    }
}

#[async_trait]
impl TelegramGateway for GrammersGateway {
    async fn authenticate(&self) -> Result<(), GramkeepError> {
        match self.client.is_authorized().await {
            Ok(true) => {
                debug!("existing session confirmed by self-lookup");
                self.save_session()?;
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => {
                let classified = classify_invocation(e);
                if !matches!(classified, GramkeepError::Unauthorized(_)) {
                    return Err(GramkeepError::AuthFailed {
                        reason: AuthFailureReason::Transport,
                        message: classified.to_string(),
                    });
                }
            }
        }

        info!("no valid session, starting interactive login");
        let token = self
            .client
            .request_login_code(&self.phone_number)
            .await
            .map_err(|e| GramkeepError::AuthFailed {
                reason: AuthFailureReason::Transport,
                message: format!("failed to request login code: {e}"),
            })?;

        let code = self
            .prompt
            .login_code()
            .map_err(|e| GramkeepError::AuthFailed {
                reason: AuthFailureReason::Cancelled,
                message: e.to_string(),
            })?;

        match self.client.sign_in(&token, code.trim()).await {
            Ok(user) => {
                info!(user_id = user.id(), "signed in");
            }
            Err(SignInError::PasswordRequired(password_token)) => {
                let hint = password_token
                    .hint()
                    .map(|h| h.to_string())
                    .unwrap_or_default();
                let password =
                    self.prompt
                        .password(&hint)
                        .map_err(|e| GramkeepError::AuthFailed {
                            reason: AuthFailureReason::Cancelled,
                            message: e.to_string(),
                        })?;
                let user = self
                    .client
                    .check_password(password_token, password.trim())
                    .await
                    .map_err(|e| GramkeepError::AuthFailed {
                        reason: AuthFailureReason::BadCredentials,
                        message: format!("2FA password rejected: {e}"),
                    })?;
                info!(user_id = user.id(), "signed in with 2FA");
            }
            Err(SignInError::Other(e)) => {
                return Err(GramkeepError::AuthFailed {
                    reason: AuthFailureReason::Transport,
                    message: classify_invocation(e).to_string(),
                });
            }
            Err(other) => {
                return Err(GramkeepError::AuthFailed {
                    reason: AuthFailureReason::BadCredentials,
                    message: other.to_string(),
                });
            }
        }

        self.save_session()?;
        info!("interactive login complete, session persisted");
        Ok(())
    }

    async fn is_authorized(&self) -> Result<bool, GramkeepError> {
        match self.client.is_authorized().await {
            Ok(authorized) => Ok(authorized),
            Err(e) => match classify_invocation(e) {
                GramkeepError::Unauthorized(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn list_dialogs(&self) -> Result<Vec<PeerInfo>, GramkeepError> {
        let mut iter = self.client.iter_dialogs();
        let mut dialogs = Vec::new();
        while let Some(dialog) = iter.next().await.map_err(classify_invocation)? {
            let chat = dialog.chat();
            let info = normalize::peer_info_from_chat(chat);
            self.cache_chat(chat, info.clone());
            dialogs.push(info);
        }
        debug!(count = dialogs.len(), "enumerated dialogs");
        Ok(dialogs)
    }

    async fn resolve_peer(&self, selector: &PeerSelector) -> Result<PeerInfo, GramkeepError> {
        match selector {
            PeerSelector::Id(id) => self
                .peers
                .get(id)
                .map(|entry| entry.info.clone())
                .ok_or_else(|| {
                    GramkeepError::NotFound(format!("peer {id} is not in the peer cache"))
                }),
            PeerSelector::Username(username) => {
                if let Some(id) = self.usernames.get(username).map(|r| *r)
                    && let Some(entry) = self.peers.get(&id)
                {
                    return Ok(entry.info.clone());
                }
                match self
                    .client
                    .resolve_username(username)
                    .await
                    .map_err(classify_invocation)?
                {
                    Some(chat) => {
                        let info = normalize::peer_info_from_chat(&chat);
                        self.cache_chat(&chat, info.clone());
                        Ok(info)
                    }
                    None => Err(GramkeepError::NotFound(format!(
                        "username @{username} not found"
                    ))),
                }
            }
        }
    }

    async fn fetch_history(
        &self,
        selector: &PeerSelector,
        request: HistoryRequest,
    ) -> Result<Vec<ArchivedMessage>, GramkeepError> {
        let (packed, info) = self.packed_peer(selector).await?;

        let mut iter = self.client.iter_messages(packed);
        if request.limit > 0 {
            iter = iter.limit(request.limit);
        }
        if let Some(offset) = request.offset_id {
            iter = iter.offset_id(offset as i32);
        }

        let mut messages = Vec::new();
        while let Some(msg) = iter.next().await.map_err(classify_invocation)? {
            let id = i64::from(msg.id());
            // Newest-first: everything from here on is at or below min_id.
            if let Some(min) = request.min_id
                && id <= min
            {
                break;
            }
            if let Some(max) = request.max_id
                && id >= max
            {
                continue;
            }
            messages.push(normalize::normalize_message(&msg, &info));
            if request.limit > 0 && messages.len() >= request.limit {
                break;
            }
        }
        debug!(
            peer = info.id,
            fetched = messages.len(),
            "history page fetched"
        );
        Ok(messages)
    }
}

/// Map a grammers invocation error onto the gramkeep taxonomy.
fn classify_invocation(err: InvocationError) -> GramkeepError {
    if let InvocationError::Rpc(rpc) = &err {
        if rpc.code == 401
            || rpc.name.starts_with("AUTH_KEY")
            || rpc.name == "SESSION_PASSWORD_NEEDED"
        {
            return GramkeepError::Unauthorized(format!("{} ({})", rpc.name, rpc.code));
        }
        if rpc.name.starts_with("FLOOD")
            && let Some(seconds) = rpc.value
        {
            return GramkeepError::FloodWait { seconds };
        }
    }
    let text = err.to_string();
    if let Some(seconds) = flood_wait_seconds(&text) {
        return GramkeepError::FloodWait { seconds };
    }
    GramkeepError::Transport {
        message: text,
        source: Some(Box::new(err)),
    }
}
