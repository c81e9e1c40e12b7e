// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One durable JSON file per [`Checkpoint`], written on every terminal
//! transition. Checkpoints are immutable once written.

use foreman_core::{Checkpoint, WorkerId};
use std::fs;
use std::path::PathBuf;

use crate::error::StorageError;

pub struct CheckpointStore {
    base_dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| StorageError::io(&base_dir, e))?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, id: &WorkerId) -> PathBuf {
        self.base_dir.join(format!("{id}.json"))
    }

    pub fn write(&self, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        let path = self.path_for(&checkpoint.worker_id);
        let payload = serde_json::to_vec_pretty(checkpoint).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        fs::write(&path, payload).map_err(|e| StorageError::io(&path, e))
    }

    pub fn get(&self, id: &WorkerId) -> Result<Option<Checkpoint>, StorageError> {
        let path = self.path_for(id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).map_err(|e| StorageError::Decode { path, offset: 0, source: e })?,
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    pub fn list(&self) -> Result<Vec<Checkpoint>, StorageError> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.base_dir).map_err(|e| StorageError::io(&self.base_dir, e))? {
            let entry = entry.map_err(|e| StorageError::io(&self.base_dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).map_err(|e| StorageError::io(&path, e))?;
            out.push(serde_json::from_slice(&bytes).map_err(|e| StorageError::Decode { path, offset: 0, source: e })?);
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "checkpoint_store_tests.rs"]
mod tests;
