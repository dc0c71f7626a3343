// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background message archiver for gramkeep.
//!
//! One cooperative worker task per process pulls jobs from the archive
//! store, syncs newer messages, backfills toward each job's target depth,
//! and records progress durably so restarts pick up where they left off.

pub mod worker;

pub use worker::SyncWorker;
