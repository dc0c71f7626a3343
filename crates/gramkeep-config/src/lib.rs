// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for gramkeep.
//!
//! Layered loading via Figment: compiled defaults, an optional local
//! `gramkeep.toml`, then environment variables (`TELEGRAM_API_ID`,
//! `TELEGRAM_API_HASH`, `TELEGRAM_PHONE_NUMBER`, `MCP_HOST`, `MCP_PORT`).
//! The environment always wins.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_str};
pub use model::{GramkeepConfig, ServerConfig, StorageConfig, SyncConfig, TelegramConfig};
pub use validation::{validate_config, ConfigError};
