// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use foreman_core::{Task, WorkerId};

fn worker(id: &str) -> Worker {
    Worker {
        id: WorkerId::new(id),
        label: "build".into(),
        project: "strategos".into(),
        status: WorkerStatus::Pending,
        health: Health::Starting,
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
fn spawn_then_status_change_is_visible() {
    let mut state = MaterializedState::new();
    let w = worker("0123abcd");
    state.apply(&Event::WorkerSpawned { worker: w.clone() });
    state.apply(&Event::WorkerStatusChanged {
        worker_id: w.id.clone(),
        from: WorkerStatus::Pending,
        to: WorkerStatus::Running,
        at_ms: 10,
    });
    assert_eq!(state.worker(&w.id).unwrap().status, WorkerStatus::Running);
}

#[test]
fn duplicate_spawn_is_idempotent() {
    let mut state = MaterializedState::new();
    let w = worker("0123abcd");
    state.apply(&Event::WorkerSpawned { worker: w.clone() });
    state.apply(&Event::WorkerStatusChanged {
        worker_id: w.id.clone(),
        from: WorkerStatus::Pending,
        to: WorkerStatus::Running,
        at_ms: 5,
    });
    // Replaying the original spawn event must not reset progress already made.
    state.apply(&Event::WorkerSpawned { worker: w });
    assert_eq!(state.len(), 1);
    assert_eq!(state.worker(&WorkerId::new("0123abcd")).unwrap().status, WorkerStatus::Running);
}

#[test]
fn terminal_status_does_not_regress() {
    let mut state = MaterializedState::new();
    let w = worker("0123abcd");
    state.apply(&Event::WorkerSpawned { worker: w.clone() });
    state.apply(&Event::WorkerCrashed { worker_id: w.id.clone(), at_ms: 10 });
    state.apply(&Event::WorkerStatusChanged {
        worker_id: w.id.clone(),
        from: WorkerStatus::Crashed,
        to: WorkerStatus::Running,
        at_ms: 20,
    });
    assert_eq!(state.worker(&w.id).unwrap().status, WorkerStatus::Crashed);
}

#[test]
fn children_and_siblings_are_derived() {
    let mut state = MaterializedState::new();
    let parent = worker("00000000");
    let mut child_a = worker("00000001");
    child_a.parent_worker_id = Some(parent.id.clone());
    let mut child_b = worker("00000002");
    child_b.parent_worker_id = Some(parent.id.clone());

    state.apply(&Event::WorkerSpawned { worker: parent.clone() });
    state.apply(&Event::WorkerSpawned { worker: child_a.clone() });
    state.apply(&Event::WorkerSpawned { worker: child_b.clone() });

    assert_eq!(state.children_of(&parent.id).len(), 2);
    assert_eq!(state.siblings_of(&child_a.id).len(), 1);
    assert_eq!(state.siblings_of(&child_a.id)[0].id, child_b.id);
}

#[test]
fn child_added_is_materialized_on_the_parent_and_idempotent() {
    let mut state = MaterializedState::new();
    let parent = worker("00000000");
    let child = worker("00000001");
    state.apply(&Event::WorkerSpawned { worker: parent.clone() });
    state.apply(&Event::WorkerSpawned { worker: child.clone() });
    state.apply(&Event::WorkerChildAdded { parent_id: parent.id.clone(), child_id: child.id.clone() });
    state.apply(&Event::WorkerChildAdded { parent_id: parent.id.clone(), child_id: child.id.clone() });

    assert_eq!(state.worker(&parent.id).unwrap().child_worker_ids, vec![child.id]);
}

#[test]
fn output_seq_tracks_the_highest_seen_plus_one() {
    let mut state = MaterializedState::new();
    let id = WorkerId::new("0123abcd");
    state.apply(&Event::WorkerOutput { worker_id: id.clone(), seq: 0, bytes: b"a".to_vec() });
    state.apply(&Event::WorkerOutput { worker_id: id.clone(), seq: 3, bytes: b"b".to_vec() });
    assert_eq!(state.next_output_seq(&id), 4);
}

#[test]
fn checkpoint_dedup_by_worker_and_death_time() {
    let mut state = MaterializedState::new();
    let ckpt = Checkpoint {
        label: "l".into(),
        project: "p".into(),
        worker_id: WorkerId::new("0123abcd"),
        created_at_ms: 0,
        died_at_ms: 100,
        final_health: Health::Dead,
        last_output_tail: vec![],
        child_worker_ids: vec![],
        parent_worker_id: None,
    };
    state.apply(&Event::CheckpointCreated { checkpoint: ckpt.clone() });
    state.apply(&Event::CheckpointCreated { checkpoint: ckpt });
    assert_eq!(state.checkpoints().len(), 1);
}
