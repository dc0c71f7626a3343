// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session blob persistence.
//!
//! The session file is an opaque, library-defined byte stream. The gateway
//! is its only reader and writer; nothing else in the workspace interprets
//! it.

use std::path::{Path, PathBuf};

use gramkeep_core::GramkeepError;

/// Single-file store for the MTProto session blob.
#[derive(Debug, Clone)]
pub struct SessionBlobStore {
    path: PathBuf,
}

impl SessionBlobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a session blob has been persisted.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the persisted blob.
    pub fn read(&self) -> Result<Vec<u8>, GramkeepError> {
        std::fs::read(&self.path).map_err(GramkeepError::storage)
    }

    /// Persist the blob, creating parent directories on demand.
    pub fn write(&self, data: &[u8]) -> Result<(), GramkeepError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(GramkeepError::storage)?;
        }
        std::fs::write(&self.path, data).map_err(GramkeepError::storage)
    }
}
