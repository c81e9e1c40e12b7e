// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn catalog_covers_every_documented_template() {
    for name in ["research", "impl", "test", "review", "fix", "general", "colonel"] {
        assert!(find(name).is_some(), "missing template {name}");
    }
}

#[test]
fn unknown_template_is_absent() {
    assert!(find("nope").is_none());
}
