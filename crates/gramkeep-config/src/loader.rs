// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order (later overrides earlier): compiled defaults, a local
//! `./gramkeep.toml`, then the environment. The environment contract is
//! fixed: `TELEGRAM_API_ID`, `TELEGRAM_API_HASH`, `TELEGRAM_PHONE_NUMBER`
//! map onto the `telegram.*` section and `MCP_HOST` / `MCP_PORT` onto the
//! `server.*` section.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::GramkeepConfig;

/// Load configuration from defaults, `./gramkeep.toml`, and the environment.
pub fn load_config() -> Result<GramkeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GramkeepConfig::default()))
        .merge(Toml::file("gramkeep.toml"))
        .merge(telegram_env())
        .merge(server_env())
        .extract()
}

/// Load configuration from a TOML string only (no file or env lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<GramkeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GramkeepConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// `TELEGRAM_*` variables mapped onto the `telegram` section.
///
/// Uses an explicit `map()` rather than `Env::split("_")` so that
/// `TELEGRAM_API_ID` becomes `telegram.api_id` and not `telegram.api.id`.
/// Restricted to the documented keys so unrelated `TELEGRAM_*` variables
/// in the environment cannot break extraction.
fn telegram_env() -> Env {
    Env::prefixed("TELEGRAM_")
        .only(&["api_id", "api_hash", "phone_number"])
        .map(|key| format!("telegram.{}", key.as_str()).into())
}

/// `MCP_*` variables mapped onto the `server` section.
fn server_env() -> Env {
    Env::prefixed("MCP_")
        .only(&["host", "port"])
        .map(|key| format!("server.{}", key.as_str()).into())
}
