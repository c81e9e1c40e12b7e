// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fixed template catalog behind `GET /workers/templates` and
//! `POST /workers/spawn-from-template` (`spec.md` §6). Each template is a
//! named `(task_type, description)` pair; spawning from one fills in
//! [`foreman_core::Task`] and runs the caller's task text through the
//! registry's ordinary [`crate::registry::Registry::spawn`] path -- there
//! is no separate admission or validation code for template spawns.

/// One catalog entry: its wire name and a short description of what kind
/// of work it's meant for.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub name: &'static str,
    pub description: &'static str,
}

pub const CATALOG: &[Template] = &[
    Template { name: "research", description: "Explore a codebase or problem space and report findings" },
    Template { name: "impl", description: "Implement a feature or change from a task description" },
    Template { name: "test", description: "Write or extend tests for existing behaviour" },
    Template { name: "review", description: "Review a change and surface defects" },
    Template { name: "fix", description: "Diagnose and fix a specific bug" },
    Template { name: "general", description: "Open-ended task with no fixed shape" },
    Template { name: "colonel", description: "Supervise and coordinate a group of other workers" },
];

pub fn find(name: &str) -> Option<&'static Template> {
    CATALOG.iter().find(|t| t.name == name)
}

#[cfg(test)]
#[path = "templates_tests.rs"]
mod tests;
