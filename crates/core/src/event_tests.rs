// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::worker::WorkerId;

#[test]
fn worker_id_extracted_for_each_variant() {
    let id = WorkerId::new("0123abcd");
    let ev = Event::WorkerCrashed { worker_id: id.clone(), at_ms: 5 };
    assert_eq!(ev.worker_id(), &id);
    assert_eq!(ev.kind(), "workerCrashed");
}

#[test]
fn checkpoint_created_extracts_worker_id_from_checkpoint() {
    let id = WorkerId::new("0123abcd");
    let ckpt = Checkpoint {
        label: "l".into(),
        project: "p".into(),
        worker_id: id.clone(),
        created_at_ms: 0,
        died_at_ms: 1,
        final_health: Health::Dead,
        last_output_tail: vec![],
        child_worker_ids: vec![],
        parent_worker_id: None,
    };
    let ev = Event::CheckpointCreated { checkpoint: ckpt };
    assert_eq!(ev.worker_id(), &id);
    assert_eq!(ev.kind(), "checkpointCreated");
}

#[test]
fn child_added_extracts_parent_as_the_worker_id() {
    let parent = WorkerId::new("00000000");
    let child = WorkerId::new("00000001");
    let ev = Event::WorkerChildAdded { parent_id: parent.clone(), child_id: child };
    assert_eq!(ev.worker_id(), &parent);
    assert_eq!(ev.kind(), "workerChildAdded");
}

#[test]
fn event_round_trips_through_json_with_tagged_type() {
    let ev = Event::WorkerOutput { worker_id: WorkerId::new("0123abcd"), seq: 3, bytes: b"hi".to_vec() };
    let json = serde_json::to_string(&ev).unwrap();
    assert!(json.contains("\"type\":\"workerOutput\""));
    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(back.kind(), "workerOutput");
}
