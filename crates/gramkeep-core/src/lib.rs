// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for gramkeep.
//!
//! This crate provides the foundational error taxonomy, the peer codec,
//! the shared value types (peer references, normalized messages), and the
//! [`TelegramGateway`] trait that the MTProto implementation and test
//! doubles both satisfy. Everything above this crate speaks in these types.

pub mod error;
pub mod peer;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{AuthFailureReason, GramkeepError};
pub use peer::PeerSelector;
pub use traits::{LoginPrompt, TelegramGateway};
pub use types::{ArchivedMessage, HistoryRequest, PeerInfo, PeerKind};
