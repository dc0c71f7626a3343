// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for gramkeep.
//!
//! One enum covers the whole workspace. Client-facing variants
//! (`InvalidPeerId`, `InvalidArgument`, `NotFound`, ...) carry a
//! human-readable message that is surfaced verbatim to tool callers;
//! `FloodWait` is the only variant handled programmatically (by the sync
//! worker's retry logic).

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// The primary error type used across all gramkeep crates.
#[derive(Debug, Error)]
pub enum GramkeepError {
    /// The caller supplied something that is neither a Telegram peer ID nor a username.
    #[error("invalid peer id: {0}")]
    InvalidPeerId(String),

    /// A tool parameter failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A search pattern did not compile as a regular expression.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// The requested peer is not present in the dialog index, even after a refresh.
    #[error("not found: {0}")]
    NotFound(String),

    /// The Telegram session is missing or no longer valid.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Telegram asked us to back off for the given number of seconds.
    #[error("flood wait: retry after {seconds}s")]
    FloodWait { seconds: u32 },

    /// Network or protocol failure talking to Telegram.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Archive database errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Interactive login did not produce a usable session.
    #[error("authentication failed ({reason}): {message}")]
    AuthFailed {
        reason: AuthFailureReason,
        message: String,
    },

    /// Configuration errors (missing required values, invalid types).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GramkeepError {
    /// Convenience constructor for transport errors without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an arbitrary error as a transport failure.
    pub fn transport_from(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap an arbitrary error as a storage failure.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(source),
        }
    }
}

/// Why interactive authentication failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum AuthFailureReason {
    /// The code or 2FA password was rejected.
    BadCredentials,
    /// The operator aborted the interactive flow.
    Cancelled,
    /// The login could not be completed for network reasons.
    Transport,
}

static FLOOD_WAIT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FLOOD_WAIT_(\d+)").unwrap());
static FLOOD_WAIT_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"wait of (\d+) seconds is required").unwrap());

/// Extract a flood-wait interval from an error message, if one is present.
///
/// Recognizes both the raw RPC error name (`FLOOD_WAIT_42`) and the prose
/// form some layers produce (`A wait of 42 seconds is required`).
pub fn flood_wait_seconds(message: &str) -> Option<u32> {
    FLOOD_WAIT_CODE
        .captures(message)
        .or_else(|| FLOOD_WAIT_TEXT.captures(message))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
