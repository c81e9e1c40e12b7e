// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn push_then_tail_concatenates_in_order() {
    let mut ring = OutputRing::new(1024);
    ring.push(0, b"hello ".to_vec());
    ring.push(1, b"world".to_vec());
    assert_eq!(ring.tail(), b"hello world");
}

#[test]
fn eviction_drops_oldest_once_capacity_exceeded() {
    let mut ring = OutputRing::new(5);
    ring.push(0, b"abc".to_vec());
    ring.push(1, b"def".to_vec());
    assert_eq!(ring.tail(), b"def");
    assert_eq!(ring.dropped_bytes(), 3);
}

#[test]
fn since_returns_only_chunks_at_or_after_seq() {
    let mut ring = OutputRing::new(1024);
    ring.push(0, b"a".to_vec());
    ring.push(1, b"b".to_vec());
    ring.push(2, b"c".to_vec());
    assert_eq!(ring.since(1), b"bc");
}

#[test]
fn oldest_retained_seq_tracks_evictions() {
    let mut ring = OutputRing::new(2);
    ring.push(0, b"a".to_vec());
    ring.push(1, b"b".to_vec());
    ring.push(2, b"c".to_vec());
    assert_eq!(ring.oldest_retained_seq(), Some(2));
}
