// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use foreman_core::WorkerId;
use std::io::Write as _;

#[test]
fn append_then_replay_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wal.log");
    let mut wal = Wal::open(&path).unwrap();
    wal.append(&Event::WorkerCrashed { worker_id: WorkerId::new("0123abcd"), at_ms: 1 }).unwrap();
    wal.append(&Event::WorkerKilled { worker_id: WorkerId::new("0123abcd"), at_ms: 2, forced: true })
        .unwrap();

    let events = Wal::replay(&path).unwrap();
    assert_eq!(events.len(), 2);
}

#[test]
fn replay_of_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let events = Wal::replay(dir.path().join("nope.log")).unwrap();
    assert!(events.is_empty());
}

#[test]
fn replay_stops_at_a_torn_tail_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wal.log");
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&Event::WorkerCrashed { worker_id: WorkerId::new("0123abcd"), at_ms: 1 }).unwrap();
    }
    // Simulate a crash mid-write: append a truncated JSON fragment.
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"{\"type\":\"workerCra").unwrap();

    let events = Wal::replay(&path).unwrap();
    assert_eq!(events.len(), 1);
}

#[test]
fn truncate_empties_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wal.log");
    let mut wal = Wal::open(&path).unwrap();
    wal.append(&Event::WorkerCrashed { worker_id: WorkerId::new("0123abcd"), at_ms: 1 }).unwrap();
    wal.truncate().unwrap();
    assert!(Wal::replay(&path).unwrap().is_empty());

    wal.append(&Event::WorkerCrashed { worker_id: WorkerId::new("0123abcd"), at_ms: 2 }).unwrap();
    assert_eq!(Wal::replay(&path).unwrap().len(), 1);
}
