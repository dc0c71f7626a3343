// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for gramkeep.
//!
//! [`MockGateway`] is a scriptable [`TelegramGateway`] double that mirrors
//! Telegram's history-paging semantics; [`TestHarness`] assembles a full
//! stack (temp SQLite archive, mock gateway, dialog index, sync worker,
//! tool dispatcher, MCP router) for end-to-end tests.

pub mod harness;
pub mod mock_gateway;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_gateway::MockGateway;
