// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoints: immutable records emitted at every terminal transition.

use crate::worker::{Health, WorkerId};
use serde::{Deserialize, Serialize};

/// Produced on any terminal transition (`completed`, `crashed`, `killed`).
/// Checkpoints are read-only and durable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub label: String,
    pub project: String,
    pub worker_id: WorkerId,
    pub created_at_ms: u64,
    pub died_at_ms: u64,
    pub final_health: Health,
    pub last_output_tail: Vec<u8>,
    pub child_worker_ids: Vec<WorkerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_worker_id: Option<WorkerId>,
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
