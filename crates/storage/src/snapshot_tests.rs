// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::state::MaterializedState;
use foreman_core::{Health, Task, WorkerId, WorkerStatus};

fn worker(id: &str) -> Worker {
    Worker {
        id: WorkerId::new(id),
        label: "build".into(),
        project: "strategos".into(),
        status: WorkerStatus::Running,
        health: Health::Healthy,
        auto_accept: false,
        auto_accept_paused: false,
        depends_on: vec![],
        parent_worker_id: None,
        parent_label: None,
        child_worker_ids: vec![],
        ralph_mode: false,
        ralph_token: None,
        task: None::<Task>,
        created_at_ms: 0,
        completed_at_ms: None,
        crashed_at_ms: None,
    }
}

#[test]
fn round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap.bin");
    let mut state = MaterializedState::new();
    state.apply(&foreman_core::Event::WorkerSpawned { worker: worker("0123abcd") });

    write_snapshot(&path, &Snapshot::from_state(&state, 42)).unwrap();
    let loaded = load_snapshot(&path).unwrap().unwrap();
    assert_eq!(loaded.wal_offset, 42);
    assert_eq!(loaded.workers.len(), 1);

    let rebuilt = loaded.into_state();
    assert_eq!(rebuilt.len(), 1);
}

#[test]
fn missing_file_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_snapshot(dir.path().join("absent.bin")).unwrap().is_none());
}

#[test]
fn corrupted_payload_is_rejected_by_checksum() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap.bin");
    let state = MaterializedState::new();
    write_snapshot(&path, &Snapshot::from_state(&state, 0)).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(&path, bytes).unwrap();

    assert!(matches!(load_snapshot(&path), Err(StorageError::ChecksumMismatch { .. })));
}
