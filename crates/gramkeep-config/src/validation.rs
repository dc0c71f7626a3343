// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. Collects all problems instead of failing fast so the
//! operator sees everything wrong with one run.

use crate::model::GramkeepConfig;

/// A single configuration problem, suitable for printing to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &GramkeepConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut push = |message: String| errors.push(ConfigError { message });

    if config.telegram.api_id == 0 {
        push("telegram.api_id is required (set TELEGRAM_API_ID)".to_string());
    }
    if config.telegram.api_hash.trim().is_empty() {
        push("telegram.api_hash is required (set TELEGRAM_API_HASH)".to_string());
    }

    let phone = config.telegram.phone_number.trim();
    if phone.is_empty() {
        push("telegram.phone_number is required (set TELEGRAM_PHONE_NUMBER)".to_string());
    } else if !phone.starts_with('+')
        || !phone[1..].chars().all(|c| c.is_ascii_digit())
        || phone.len() < 8
    {
        push(format!(
            "telegram.phone_number `{phone}` is not an E.164 number (expected +<country><number>)"
        ));
    }

    let host = config.server.host.trim();
    if host.is_empty() {
        push("server.host must not be empty".to_string());
    } else if !is_bindable_host(host) {
        push(format!(
            "server.host `{host}` is neither an IP address nor a hostname"
        ));
    }

    if config.storage.data_dir.trim().is_empty() {
        push("storage.data_dir must not be empty".to_string());
    }

    if config.sync.batch_size == 0 {
        push("sync.batch_size must be greater than zero".to_string());
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Accepts anything `TcpListener::bind` could plausibly take as a host:
/// an IPv4/IPv6 literal, or a DNS name made of dot-separated labels
/// (1-63 chars each, alphanumeric with interior hyphens).
fn is_bindable_host(host: &str) -> bool {
    if host.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
