// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the Telegram layer and everything above it.

use async_trait::async_trait;

use crate::error::GramkeepError;
use crate::peer::PeerSelector;
use crate::types::{ArchivedMessage, HistoryRequest, PeerInfo};

/// Access to a personal Telegram account.
///
/// Implemented by the MTProto client in `gramkeep-telegram` and by the mock
/// in `gramkeep-test-utils`. All MTProto traffic is serialized behind the
/// implementation; callers may share one instance through `Arc`.
#[async_trait]
pub trait TelegramGateway: Send + Sync {
    /// Ensure a usable session exists, driving the interactive login flow
    /// if necessary, and persist the session blob on success.
    async fn authenticate(&self) -> Result<(), GramkeepError>;

    /// Probe the session with a self-lookup. `Ok(false)` means the session
    /// is missing or rejected; transport failures are errors.
    async fn is_authorized(&self) -> Result<bool, GramkeepError>;

    /// Enumerate all dialogs, most-recently-active first.
    ///
    /// Also warms the implementation's peer cache so that subsequent
    /// history calls can address peers by id.
    async fn list_dialogs(&self) -> Result<Vec<PeerInfo>, GramkeepError>;

    /// Resolve a selector to a peer.
    ///
    /// Numeric ids resolve through the peer cache; usernames fall back to a
    /// server-side lookup when the id is not cached. Unknown peers fail
    /// with `NotFound`.
    async fn resolve_peer(&self, selector: &PeerSelector) -> Result<PeerInfo, GramkeepError>;

    /// Fetch one page of history for a peer, newest-first, honoring the
    /// cursor controls in [`HistoryRequest`].
    async fn fetch_history(
        &self,
        selector: &PeerSelector,
        request: HistoryRequest,
    ) -> Result<Vec<ArchivedMessage>, GramkeepError>;
}

/// Interactive credentials source for the login flow.
///
/// The library crates never touch stdin; the binary provides a TTY
/// implementation and tests provide canned answers.
pub trait LoginPrompt: Send + Sync {
    /// The SMS/app login code.
    fn login_code(&self) -> Result<String, GramkeepError>;

    /// The 2FA password. `hint` is the account's password hint, possibly empty.
    fn password(&self, hint: &str) -> Result<String, GramkeepError>;
}
