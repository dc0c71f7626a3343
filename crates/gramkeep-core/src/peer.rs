// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Peer codec: normalize external identifiers into peer selectors.
//!
//! Everything a caller can hand us (a signed integer, a numeric string, a
//! username with or without `@`) funnels through [`PeerSelector::parse`]
//! before any lookup or network request. The codec is pure and total: it
//! either produces a selector or fails with `InvalidPeerId`.
//!
//! Numeric ids pass through verbatim. Telegram marks channels and
//! supergroups with a `-100...` prefix and small groups with a plain
//! negation; the codec neither strips nor adds those marks. That mapping
//! lives in [`mark_id`] / [`kind_of_marked`] and is only applied when
//! canonicalizing ids the library reports bare.

use serde_json::Value;

use crate::error::GramkeepError;
use crate::types::PeerKind;

/// Offset applied to channel/supergroup ids to form the marked `-100...` id.
pub const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// A normalized external identifier: either a canonical signed id or a
/// lowercase username.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PeerSelector {
    Id(i64),
    Username(String),
}

impl PeerSelector {
    /// Parse a string identifier.
    ///
    /// Numeric strings (optionally signed) become [`PeerSelector::Id`];
    /// anything else is treated as a username, lowercased, with a leading
    /// `@` removed. Empty input, bare `@`, and mixed content such as
    /// `"12ab"` fail.
    pub fn parse(input: &str) -> Result<Self, GramkeepError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(GramkeepError::InvalidPeerId(
                "empty peer identifier".to_string(),
            ));
        }

        if looks_numeric(trimmed) {
            return trimmed
                .parse::<i64>()
                .map(Self::Id)
                .map_err(|_| GramkeepError::InvalidPeerId(format!("`{trimmed}` is out of range")));
        }

        let username = trimmed.strip_prefix('@').unwrap_or(trimmed).to_lowercase();
        if !is_valid_username(&username) {
            return Err(GramkeepError::InvalidPeerId(format!(
                "`{input}` is neither a numeric id nor a username"
            )));
        }
        Ok(Self::Username(username))
    }

    /// Parse a JSON value as received in tool parameters.
    ///
    /// Accepts integers and strings; floats, booleans, and anything else
    /// fail with `InvalidPeerId`.
    pub fn from_value(value: &Value) -> Result<Self, GramkeepError> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Id).ok_or_else(|| {
                GramkeepError::InvalidPeerId(format!("`{n}` is not a signed 64-bit integer"))
            }),
            Value::String(s) => Self::parse(s),
            other => Err(GramkeepError::InvalidPeerId(format!(
                "expected a number or string, got {other}"
            ))),
        }
    }
}

impl From<i64> for PeerSelector {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl std::fmt::Display for PeerSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(u) => write!(f, "@{u}"),
        }
    }
}

/// Canonicalize a bare library id into the signed marked form.
pub fn mark_id(kind: PeerKind, bare_id: i64) -> i64 {
    match kind {
        PeerKind::User => bare_id,
        PeerKind::Chat => -bare_id,
        PeerKind::Channel => -CHANNEL_ID_OFFSET - bare_id,
    }
}

/// Classify a marked id back into its peer kind.
pub fn kind_of_marked(id: i64) -> PeerKind {
    if id <= -CHANNEL_ID_OFFSET {
        PeerKind::Channel
    } else if id < 0 {
        PeerKind::Chat
    } else {
        PeerKind::User
    }
}

fn looks_numeric(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_valid_username(u: &str) -> bool {
    let mut chars = u.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
