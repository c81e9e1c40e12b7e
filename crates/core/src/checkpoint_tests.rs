// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn checkpoint_round_trips_through_json() {
    let ckpt = Checkpoint {
        label: "TEST: a".into(),
        project: "strategos".into(),
        worker_id: WorkerId::new("0123abcd"),
        created_at_ms: 1_000,
        died_at_ms: 2_000,
        final_health: Health::Dead,
        last_output_tail: b"done".to_vec(),
        child_worker_ids: vec![],
        parent_worker_id: None,
    };
    let json = serde_json::to_string(&ckpt).unwrap();
    let back: Checkpoint = serde_json::from_str(&json).unwrap();
    assert_eq!(back.worker_id, ckpt.worker_id);
    assert_eq!(back.last_output_tail, ckpt.last_output_tail);
}
