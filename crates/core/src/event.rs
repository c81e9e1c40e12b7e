// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry and worker events delivered by the event fan-out (`spec.md` §4.5).

use crate::checkpoint::Checkpoint;
use crate::worker::{Health, Worker, WorkerId, WorkerStatus};
use serde::{Deserialize, Serialize};

/// A single event produced by the worker registry.
///
/// Every variant that embeds a [`Worker`] carries the already-stripped
/// external view (see [`Worker::strip_secret`]) — the fan-out never leaks
/// `ralph_token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    WorkerSpawned { worker: Worker },
    WorkerStatusChanged { worker_id: WorkerId, from: WorkerStatus, to: WorkerStatus, at_ms: u64 },
    WorkerHealthChanged { worker_id: WorkerId, from: Health, to: Health, at_ms: u64 },
    WorkerSettingsChanged { worker_id: WorkerId, auto_accept: bool, auto_accept_paused: bool },
    WorkerLabelChanged { worker_id: WorkerId, label: String },
    WorkerCrashed { worker_id: WorkerId, at_ms: u64 },
    WorkerKilled { worker_id: WorkerId, at_ms: u64, forced: bool },
    WorkerOutput { worker_id: WorkerId, seq: u64, bytes: Vec<u8> },
    WorkerDiscovered { worker: Worker },
    CheckpointCreated { checkpoint: Checkpoint },
    WorkerReaped { worker_id: WorkerId },
    WorkerChildAdded { parent_id: WorkerId, child_id: WorkerId },
}

impl Event {
    /// The worker this event is about, for subscriber-side filtering.
    pub fn worker_id(&self) -> &WorkerId {
        match self {
            Event::WorkerSpawned { worker } | Event::WorkerDiscovered { worker } => &worker.id,
            Event::WorkerStatusChanged { worker_id, .. }
            | Event::WorkerHealthChanged { worker_id, .. }
            | Event::WorkerSettingsChanged { worker_id, .. }
            | Event::WorkerLabelChanged { worker_id, .. }
            | Event::WorkerCrashed { worker_id, .. }
            | Event::WorkerKilled { worker_id, .. }
            | Event::WorkerOutput { worker_id, .. }
            | Event::WorkerReaped { worker_id } => worker_id,
            Event::CheckpointCreated { checkpoint } => &checkpoint.worker_id,
            Event::WorkerChildAdded { parent_id, .. } => parent_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::WorkerSpawned { .. } => "workerSpawned",
            Event::WorkerStatusChanged { .. } => "workerStatusChanged",
            Event::WorkerHealthChanged { .. } => "workerHealthChanged",
            Event::WorkerSettingsChanged { .. } => "workerSettingsChanged",
            Event::WorkerLabelChanged { .. } => "workerLabelChanged",
            Event::WorkerCrashed { .. } => "workerCrashed",
            Event::WorkerKilled { .. } => "workerKilled",
            Event::WorkerOutput { .. } => "workerOutput",
            Event::WorkerDiscovered { .. } => "workerDiscovered",
            Event::CheckpointCreated { .. } => "checkpointCreated",
            Event::WorkerReaped { .. } => "workerReaped",
            Event::WorkerChildAdded { .. } => "workerChildAdded",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
