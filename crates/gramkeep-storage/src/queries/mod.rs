// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the archive database.

pub mod jobs;
pub mod messages;
