// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MCP transport host for gramkeep.
//!
//! Hosts the streamable-HTTP MCP endpoint on axum: JSON-RPC 2.0 framing,
//! per-connection sessions keyed by the `mcp-session-id` header, and the
//! five Telegram tools dispatched against the gateway, dialog index, and
//! archive.

pub mod protocol;
pub mod server;
pub mod session;
pub mod tools;

pub use server::{build_router, serve, McpServerState};
pub use session::SessionRegistry;
pub use tools::ToolDispatcher;
