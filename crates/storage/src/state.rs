// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-memory projection rebuilt by replaying the write-ahead log.

use foreman_core::{Checkpoint, Event, Health, Worker, WorkerId, WorkerStatus};
use std::collections::HashMap;

/// Current view of every known worker, derived purely by folding [`Event`]s.
///
/// Rebuilding is idempotent: applying the same event twice (as can happen
/// after a crash mid-fsync) must not corrupt the projection. Every apply
/// path is written to tolerate that.
#[derive(Debug, Clone, Default)]
pub struct MaterializedState {
    workers: HashMap<WorkerId, Worker>,
    next_output_seq: HashMap<WorkerId, u64>,
    checkpoints: Vec<Checkpoint>,
}

impl MaterializedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn worker(&self, id: &WorkerId) -> Option<&Worker> {
        self.workers.get(id)
    }

    pub fn workers(&self) -> impl Iterator<Item = &Worker> {
        self.workers.values()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn children_of(&self, id: &WorkerId) -> Vec<&Worker> {
        self.workers.values().filter(|w| w.parent_worker_id.as_ref() == Some(id)).collect()
    }

    pub fn siblings_of(&self, id: &WorkerId) -> Vec<&Worker> {
        match self.worker(id).and_then(|w| w.parent_worker_id.clone()) {
            Some(parent) => self.children_of(&parent).into_iter().filter(|w| &w.id != id).collect(),
            None => Vec::new(),
        }
    }

    /// Fold a single event into the projection. Idempotent for every
    /// variant: re-applying a status transition that already landed, or a
    /// duplicate spawn for a known id, is a no-op rather than an error.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::WorkerSpawned { worker } | Event::WorkerDiscovered { worker } => {
                self.workers.entry(worker.id.clone()).or_insert_with(|| worker.clone());
            }
            Event::WorkerStatusChanged { worker_id, to, at_ms, .. } => {
                if let Some(w) = self.workers.get_mut(worker_id) {
                    if !w.status.is_terminal() {
                        w.status = *to;
                        if *to == WorkerStatus::Completed {
                            w.completed_at_ms = Some(*at_ms);
                        }
                    }
                }
            }
            Event::WorkerHealthChanged { worker_id, to, .. } => {
                if let Some(w) = self.workers.get_mut(worker_id) {
                    w.health = *to;
                }
            }
            Event::WorkerSettingsChanged { worker_id, auto_accept, auto_accept_paused } => {
                if let Some(w) = self.workers.get_mut(worker_id) {
                    w.auto_accept = *auto_accept;
                    w.auto_accept_paused = *auto_accept_paused;
                }
            }
            Event::WorkerLabelChanged { worker_id, label } => {
                if let Some(w) = self.workers.get_mut(worker_id) {
                    w.label = label.clone();
                }
            }
            Event::WorkerCrashed { worker_id, at_ms } => {
                if let Some(w) = self.workers.get_mut(worker_id) {
                    if !w.status.is_terminal() {
                        w.status = WorkerStatus::Crashed;
                        w.health = Health::Dead;
                        w.crashed_at_ms = Some(*at_ms);
                    }
                }
            }
            Event::WorkerKilled { worker_id, at_ms, .. } => {
                if let Some(w) = self.workers.get_mut(worker_id) {
                    if !w.status.is_terminal() {
                        w.status = WorkerStatus::Killed;
                        w.health = Health::Dead;
                        w.crashed_at_ms = Some(*at_ms);
                    }
                }
            }
            Event::WorkerOutput { worker_id, seq, .. } => {
                let entry = self.next_output_seq.entry(worker_id.clone()).or_insert(0);
                *entry = (*entry).max(seq + 1);
            }
            Event::CheckpointCreated { checkpoint } => {
                if !self.checkpoints.iter().any(|c| {
                    c.worker_id == checkpoint.worker_id && c.died_at_ms == checkpoint.died_at_ms
                }) {
                    self.checkpoints.push(checkpoint.clone());
                }
            }
            Event::WorkerReaped { worker_id } => {
                self.workers.remove(worker_id);
                self.next_output_seq.remove(worker_id);
            }
            Event::WorkerChildAdded { parent_id, child_id } => {
                if let Some(p) = self.workers.get_mut(parent_id) {
                    if !p.child_worker_ids.contains(child_id) {
                        p.child_worker_ids.push(child_id.clone());
                    }
                }
            }
        }
    }

    /// Fold a batch in order, as done during WAL replay at startup.
    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) {
        for event in events {
            self.apply(event);
        }
    }

    pub fn next_output_seq(&self, id: &WorkerId) -> u64 {
        self.next_output_seq.get(id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
