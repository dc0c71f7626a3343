// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so that a typo in
//! `gramkeep.toml` is rejected at startup instead of silently ignored.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level gramkeep configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GramkeepConfig {
    /// Telegram API credentials and account identity.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// MCP server bind settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// On-disk locations for the session blob and archive database.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Sync worker pacing.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Telegram API credentials, obtained from <https://my.telegram.org>.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Application api_id. Required.
    #[serde(default)]
    pub api_id: i32,

    /// Application api_hash. Required.
    #[serde(default)]
    pub api_hash: String,

    /// Account phone number in E.164 form (`+15551234567`). Required.
    #[serde(default)]
    pub phone_number: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_id: 0,
            api_hash: String::new(),
            phone_number: String::new(),
        }
    }
}

/// MCP server bind configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Filesystem layout for persistent state.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding the session blob and archive database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Session blob filename inside `data_dir`.
    #[serde(default = "default_session_file")]
    pub session_file: String,

    /// Archive database filename inside `data_dir`.
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            session_file: default_session_file(),
            database_file: default_database_file(),
        }
    }
}

impl StorageConfig {
    /// Full path to the session blob.
    pub fn session_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.session_file)
    }

    /// Full path to the archive database.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.database_file)
    }
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_session_file() -> String {
    "session.json".to_string()
}

fn default_database_file() -> String {
    "messages.db".to_string()
}

/// Sync worker pacing and batch sizing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Messages fetched per history request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between jobs, in seconds.
    #[serde(default = "default_inter_job_delay_secs")]
    pub inter_job_delay_secs: u64,

    /// Pause between backfill chunks, in milliseconds.
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            inter_job_delay_secs: default_inter_job_delay_secs(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
        }
    }
}

impl SyncConfig {
    /// Pause between jobs.
    pub fn inter_job_delay(&self) -> Duration {
        Duration::from_secs(self.inter_job_delay_secs)
    }

    /// Pause between backfill chunks.
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_inter_job_delay_secs() -> u64 {
    3
}

fn default_inter_batch_delay_ms() -> u64 {
    1100
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
