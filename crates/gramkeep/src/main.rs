// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! gramkeep - a personal Telegram account exposed as MCP tools.
//!
//! This is the binary entry point.

use clap::{Parser, Subcommand};

mod prompt;
mod serve;
mod shutdown;

/// gramkeep - a personal Telegram account exposed as MCP tools.
#[derive(Parser, Debug)]
#[command(name = "gramkeep", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Authenticate, build the dialog index, and serve MCP over HTTP.
    Serve,
    /// Run only the interactive Telegram login, then exit.
    ///
    /// Useful for seeding the session file on a TTY before running
    /// `serve` headless.
    Login,
}

#[tokio::main]
async fn main() {
    // Load .env before anything else (silently ignore if missing).
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve => serve::run_serve().await,
        Commands::Login => serve::run_login().await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
