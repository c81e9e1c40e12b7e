// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic liveness poll for every `running` worker (`spec.md` §4.3).
//!
//! A worker's `Health` is independent of its `WorkerStatus`: a process can
//! be `running` and `unhealthy` at the same time, right up until the
//! `unhealthy_threshold`th consecutive bad poll turns it into a crash.

use foreman_core::{Health, WorkerId, WorkerStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::registry::Registry;
use crate::session::SessionAdapter;

/// Consecutive good/bad poll counters, kept per worker between ticks.
#[derive(Default, Clone, Copy)]
struct Streak {
    consecutive_alive: u32,
    consecutive_dead: u32,
}

pub struct HealthPoller<S: SessionAdapter> {
    registry: Arc<Registry<S>>,
    unhealthy_threshold: u32,
    healthy_threshold: u32,
    streaks: HashMap<WorkerId, Streak>,
}

impl<S: SessionAdapter> HealthPoller<S> {
    pub fn new(registry: Arc<Registry<S>>, unhealthy_threshold: u32, healthy_threshold: u32) -> Self {
        Self { registry, unhealthy_threshold, healthy_threshold, streaks: HashMap::new() }
    }

    /// Poll every currently-running worker once. Public so tests can drive
    /// it without waiting on the interval timer.
    pub async fn tick(&mut self) {
        let ids = self.registry.running_ids();
        self.streaks.retain(|id, _| ids.contains(id));

        for id in ids {
            let alive = self.registry.is_session_alive(&id).await;
            let streak = self.streaks.entry(id.clone()).or_default();

            if alive {
                streak.consecutive_alive += 1;
                streak.consecutive_dead = 0;
                let target = if streak.consecutive_alive >= self.healthy_threshold { Health::Healthy } else { Health::Degraded };
                let _ = self.registry.note_health(&id, target).await;
            } else {
                streak.consecutive_dead += 1;
                streak.consecutive_alive = 0;
                if streak.consecutive_dead >= self.unhealthy_threshold {
                    let _ = self.registry.note_health(&id, Health::Unhealthy).await;
                    let _ = self.registry.mark_crashed(&id).await;
                    self.streaks.remove(&id);
                } else {
                    let _ = self.registry.note_health(&id, Health::Degraded).await;
                }
            }
        }
    }

    /// Run forever on `interval`, until `shutdown` resolves.
    pub async fn run(mut self, interval: Duration, shutdown: tokio_util::sync::CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = shutdown.cancelled() => break,
            }
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
