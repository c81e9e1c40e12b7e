// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to decode record at offset {offset} in {path}: {source}")]
    Decode { path: PathBuf, offset: u64, #[source] source: serde_json::Error },

    #[error("checksum mismatch for snapshot {path}")]
    ChecksumMismatch { path: PathBuf },

    #[error("another foremand instance holds the lock at {path}")]
    AlreadyLocked { path: PathBuf },

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
