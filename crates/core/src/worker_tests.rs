// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generated_id_matches_external_format() {
    for _ in 0..50 {
        let id = WorkerId::generate();
        assert!(is_valid_id(id.as_str()), "{} did not match format", id);
    }
}

#[test]
fn parse_rejects_wrong_length() {
    assert!(WorkerId::parse("abcd").is_none());
    assert!(WorkerId::parse("abcdef0123").is_none());
}

#[test]
fn parse_rejects_uppercase() {
    assert!(WorkerId::parse("ABCDEF01").is_none());
}

#[test]
fn parse_accepts_valid() {
    assert!(WorkerId::parse("0123abcd").is_some());
}

#[test]
fn label_exactly_200_bytes_accepted() {
    let label = "a".repeat(200);
    assert!(validate_label(&label).is_ok());
}

#[test]
fn label_201_bytes_rejected() {
    let label = "a".repeat(201);
    assert!(validate_label(&label).is_err());
}

#[test]
fn label_empty_rejected() {
    assert!(validate_label("").is_err());
}

#[test]
fn label_with_control_char_rejected() {
    assert!(validate_label("hello\nworld").is_err());
    assert!(validate_label("hello\u{7f}").is_err());
}

#[test]
fn terminal_states_never_revert() {
    assert!(WorkerStatus::Completed.is_terminal());
    assert!(WorkerStatus::Crashed.is_terminal());
    assert!(WorkerStatus::Killed.is_terminal());
    assert!(!WorkerStatus::Running.is_terminal());
    assert!(!WorkerStatus::Pending.is_terminal());
    assert!(!WorkerStatus::AwaitingReview.is_terminal());
}

#[test]
fn strip_secret_removes_ralph_token() {
    let worker = Worker {
        id: WorkerId::generate(),
        label: "test".into(),
        project: "proj".into(),
        status: WorkerStatus::Running,
        health: Health::Healthy,
        auto_accept: true,
        auto_accept_paused: false,
        depends_on: vec![],
        parent_worker_id: None,
        parent_label: None,
        child_worker_ids: vec![],
        ralph_mode: true,
        ralph_token: Some(RalphToken::generate()),
        task: None,
        created_at_ms: 0,
        completed_at_ms: None,
        crashed_at_ms: None,
    };
    let stripped = worker.strip_secret();
    assert!(stripped.ralph_token.is_none());
    let json = serde_json::to_string(&stripped).unwrap();
    assert!(!json.contains("ralph_token"));
}
