// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTY credential prompts for the interactive login flow.
//!
//! The login code is read from stdin; the 2FA password goes through
//! `rpassword` so it never echoes. Headless runs (no TTY) fail fast with a
//! pointer at the `login` subcommand.

use std::io::{BufRead, IsTerminal, Write};

use gramkeep_core::{AuthFailureReason, GramkeepError, LoginPrompt};

/// Interactive prompt backed by the controlling terminal.
pub struct StdinPrompt;

impl StdinPrompt {
    pub fn new() -> Self {
        Self
    }

    fn ensure_tty(&self) -> Result<(), GramkeepError> {
        if std::io::stdin().is_terminal() {
            Ok(())
        } else {
            Err(GramkeepError::AuthFailed {
                reason: AuthFailureReason::Cancelled,
                message: "interactive login required but stdin is not a terminal; \
                          run `gramkeep login` on a TTY first"
                    .to_string(),
            })
        }
    }
}

impl Default for StdinPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginPrompt for StdinPrompt {
    fn login_code(&self) -> Result<String, GramkeepError> {
        self.ensure_tty()?;
        eprint!("Telegram login code: ");
        let _ = std::io::stderr().flush();

        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| GramkeepError::AuthFailed {
                reason: AuthFailureReason::Cancelled,
                message: format!("failed to read login code: {e}"),
            })?;

        let code = line.trim().to_string();
        if code.is_empty() {
            return Err(GramkeepError::AuthFailed {
                reason: AuthFailureReason::Cancelled,
                message: "empty login code".to_string(),
            });
        }
        Ok(code)
    }

    fn password(&self, hint: &str) -> Result<String, GramkeepError> {
        self.ensure_tty()?;
        let message = if hint.is_empty() {
            "Telegram 2FA password: ".to_string()
        } else {
            format!("Telegram 2FA password (hint: {hint}): ")
        };

        let password =
            rpassword::prompt_password(message).map_err(|e| GramkeepError::AuthFailed {
                reason: AuthFailureReason::Cancelled,
                message: format!("failed to read password: {e}"),
            })?;

        if password.is_empty() {
            return Err(GramkeepError::AuthFailed {
                reason: AuthFailureReason::Cancelled,
                message: "empty password".to_string(),
            });
        }
        Ok(password)
    }
}
