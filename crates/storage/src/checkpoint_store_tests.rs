// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use foreman_core::Health;

fn sample(id: &str) -> Checkpoint {
    Checkpoint {
        label: "l".into(),
        project: "p".into(),
        worker_id: WorkerId::new(id),
        created_at_ms: 0,
        died_at_ms: 1,
        final_health: Health::Dead,
        last_output_tail: vec![],
        child_worker_ids: vec![],
        parent_worker_id: None,
    }
}

#[test]
fn write_then_get_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::new(dir.path()).unwrap();
    let ckpt = sample("0123abcd");
    store.write(&ckpt).unwrap();
    let back = store.get(&ckpt.worker_id).unwrap().unwrap();
    assert_eq!(back.worker_id, ckpt.worker_id);
}

#[test]
fn get_of_unknown_worker_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::new(dir.path()).unwrap();
    assert!(store.get(&WorkerId::new("0123abcd")).unwrap().is_none());
}

#[test]
fn list_returns_every_written_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::new(dir.path()).unwrap();
    store.write(&sample("00000000")).unwrap();
    store.write(&sample("00000001")).unwrap();
    assert_eq!(store.list().unwrap().len(), 2);
}
