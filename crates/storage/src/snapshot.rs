// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic compacted state, so startup doesn't replay the WAL from the
//! beginning of time. Format: `sha256(payload) || zstd(payload)`, where
//! `payload` is the JSON-encoded [`Snapshot`].

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::StorageError;
use crate::state::MaterializedState;
use foreman_core::Worker;

const ZSTD_LEVEL: i32 = 3;
const HASH_LEN: usize = 32;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub workers: Vec<Worker>,
    pub checkpoints: Vec<foreman_core::Checkpoint>,
    /// WAL byte offset this snapshot is current as of; records before this
    /// offset never need replaying again.
    pub wal_offset: u64,
}

impl Snapshot {
    pub fn from_state(state: &MaterializedState, wal_offset: u64) -> Self {
        Self {
            workers: state.workers().cloned().collect(),
            checkpoints: state.checkpoints().to_vec(),
            wal_offset,
        }
    }

    pub fn into_state(self) -> MaterializedState {
        let mut state = MaterializedState::new();
        for worker in self.workers {
            state.apply(&foreman_core::Event::WorkerSpawned { worker });
        }
        for checkpoint in self.checkpoints {
            state.apply(&foreman_core::Event::CheckpointCreated { checkpoint });
        }
        state
    }
}

pub fn write_snapshot(path: impl AsRef<Path>, snapshot: &Snapshot) -> Result<(), StorageError> {
    let path = path.as_ref();
    let payload = serde_json::to_vec(snapshot).map_err(|e| StorageError::Corrupt(e.to_string()))?;
    let hash = Sha256::digest(&payload);
    let compressed = zstd::encode_all(&payload[..], ZSTD_LEVEL).map_err(|e| StorageError::io(path, e))?;

    let tmp = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp).map_err(|e| StorageError::io(&tmp, e))?;
    file.write_all(&hash).map_err(|e| StorageError::io(&tmp, e))?;
    file.write_all(&compressed).map_err(|e| StorageError::io(&tmp, e))?;
    file.sync_all().map_err(|e| StorageError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Option<Snapshot>, StorageError> {
    let path = path.as_ref();
    let raw = match fs::read(path) {
        Ok(r) => r,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    if raw.len() < HASH_LEN {
        return Err(StorageError::Corrupt("snapshot file shorter than checksum header".into()));
    }
    let (expected_hash, compressed) = raw.split_at(HASH_LEN);
    let payload = zstd::decode_all(compressed).map_err(|e| StorageError::io(path, e))?;
    let actual_hash = Sha256::digest(&payload);
    if actual_hash.as_slice() != expected_hash {
        return Err(StorageError::ChecksumMismatch { path: path.to_path_buf() });
    }
    let snapshot: Snapshot =
        serde_json::from_slice(&payload).map_err(|e| StorageError::Decode { path: path.to_path_buf(), offset: 0, source: e })?;
    Ok(Some(snapshot))
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
