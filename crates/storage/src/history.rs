// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable, append-only store for worker output that has aged out of the
//! in-memory [`crate::OutputRing`]. One file per worker under `base_dir`,
//! pruned by the periodic sweep once a worker's record is older than the
//! configured retention window.

use foreman_core::WorkerId;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::StorageError;

pub struct OutputHistoryStore {
    base_dir: PathBuf,
}

impl OutputHistoryStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| StorageError::io(&base_dir, e))?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, id: &WorkerId) -> PathBuf {
        self.base_dir.join(format!("{id}.log"))
    }

    pub fn append(&self, id: &WorkerId, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(id);
        let mut file =
            OpenOptions::new().create(true).append(true).open(&path).map_err(|e| StorageError::io(&path, e))?;
        file.write_all(bytes).map_err(|e| StorageError::io(&path, e))
    }

    pub fn read_all(&self, id: &WorkerId) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(id);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    /// Remove history files untouched for longer than `retention`, relative
    /// to `now`. Returns the ids pruned.
    pub fn prune(&self, now: SystemTime, retention: Duration) -> Result<Vec<WorkerId>, StorageError> {
        let mut pruned = Vec::new();
        let entries = fs::read_dir(&self.base_dir).map_err(|e| StorageError::io(&self.base_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.base_dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("log") {
                continue;
            }
            let metadata = entry.metadata().map_err(|e| StorageError::io(&path, e))?;
            let age = now.duration_since(metadata.modified().map_err(|e| StorageError::io(&path, e))?);
            if age.map(|a| a > retention).unwrap_or(false) {
                if let Some(id) = worker_id_from_path(&path) {
                    fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))?;
                    pruned.push(id);
                }
            }
        }
        Ok(pruned)
    }
}

fn worker_id_from_path(path: &Path) -> Option<WorkerId> {
    path.file_stem().and_then(|s| s.to_str()).map(WorkerId::new)
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
