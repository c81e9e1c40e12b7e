// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn second_acquire_fails_while_first_is_held() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foremand.pid");
    let first = PidLock::acquire(&path).unwrap();
    let second = PidLock::acquire(&path);
    assert!(second.is_err());
    drop(first);
    assert!(PidLock::acquire(&path).is_ok());
}
