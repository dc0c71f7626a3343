// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema migrations for the archive database.
//!
//! The `migrations/` directory is baked into the binary by refinery, so a
//! freshly deployed build can upgrade any older database file it finds:
//! V1 lays down `jobs` and `messages`, V2 grows the jobs table by the
//! backfill columns. Bookkeeping lives in refinery's own
//! `refinery_schema_history` table; already-applied versions are skipped.

use gramkeep_core::GramkeepError;
use tracing::debug;

mod sql {
    refinery::embed_migrations!("migrations");
}

/// Bring the connection's schema up to the current version.
///
/// Returns the number of migrations that were applied by this call (zero
/// when the database is already current).
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<usize, GramkeepError> {
    let report = sql::migrations::runner()
        .run(conn)
        .map_err(GramkeepError::storage)?;

    let applied = report.applied_migrations().len();
    if applied > 0 {
        debug!(applied, "database schema migrated");
    }
    Ok(applied)
}
