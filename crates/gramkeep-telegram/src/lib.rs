// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram layer for gramkeep.
//!
//! Implements [`TelegramGateway`](gramkeep_core::TelegramGateway) over the
//! grammers MTProto client: session blob persistence, interactive login,
//! dialog enumeration, peer resolution, and history fetching with
//! flood-wait classification. Also provides the in-memory dialog index
//! that tool handlers consult.

pub mod dialogs;
pub mod gateway;
pub mod normalize;
pub mod session_store;

pub use dialogs::{DialogDirectory, DialogIndex};
pub use gateway::GrammersGateway;
pub use session_store::SessionBlobStore;
