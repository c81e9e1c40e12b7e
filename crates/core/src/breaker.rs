// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Circuit breaker: guard a named external dependency from cascade failure.
//!
//! A single breaker tracks one `{closed, open, half-open}` state machine. The
//! breaker itself never runs the guarded operation — callers call
//! [`CircuitBreaker::acquire`] for an admission [`Permit`], run their
//! operation, then report the outcome back through [`Permit::success`] or
//! [`Permit::failure`]. This keeps the breaker synchronous and executor
//! agnostic; async call sites simply `.await` between acquire and report.

use crate::clock::Clock;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const DURATION_WINDOW: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

crate::simple_display! {
    BreakerState {
        Closed => "closed",
        Open => "open",
        HalfOpen => "half_open",
    }
}

/// Per-breaker configuration, supplied only when the breaker is created.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub open_timeout: Duration,
    /// `None` disables the slow-call penalty.
    pub slow_call_duration_threshold: Option<Duration>,
    /// `None` disables the volume gate (closed->open requires this many
    /// total calls observed, in addition to `failure_threshold`).
    pub volume_threshold: Option<u64>,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(30),
            slow_call_duration_threshold: None,
            volume_threshold: None,
        }
    }
}

/// Reason a breaker transitioned state, for the `stateChange` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    FailureThresholdReached,
    OpenTimeoutElapsed,
    HalfOpenProbeSucceeded,
    HalfOpenProbeFailed,
}

/// Events a breaker emits for consumption by the event fan-out.
#[derive(Debug, Clone)]
pub enum BreakerEvent {
    StateChange { name: String, from: BreakerState, to: BreakerState, at_ms: u64, reason: TransitionReason },
    Success { name: String },
    Failure { name: String, error: String },
    Rejected { name: String, reason: RejectReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Open,
    HalfOpenBusy,
}

/// The breaker failed fast without running the caller's operation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("circuit '{name}' is open, retry in {remaining_ms}ms")]
pub struct CircuitOpen {
    pub name: String,
    pub remaining_ms: u64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BreakerMetrics {
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub rejections: u64,
    pub slow_calls: u64,
    pub state_changes: u64,
}

struct Inner {
    state: BreakerState,
    failure_count: u32,
    half_open_success_count: u32,
    total_calls: u64,
    last_failure_at: Option<Instant>,
    last_state_change_at: Instant,
    half_open_in_flight: bool,
    metrics: BreakerMetrics,
    recent_durations: VecDeque<Duration>,
}

/// An admission token. The breaker's only public contract: acquire,
/// run the guarded operation, report the outcome.
#[derive(Debug)]
#[must_use = "a Permit must be resolved with success() or failure()"]
pub struct Permit {
    admitted_as_probe: bool,
}

pub struct CircuitBreaker<C: Clock> {
    name: String,
    config: BreakerConfig,
    clock: C,
    inner: parking_lot::Mutex<Inner>,
}

impl<C: Clock> CircuitBreaker<C> {
    pub fn new(name: impl Into<String>, config: BreakerConfig, clock: C) -> Self {
        let now = clock.now();
        Self {
            name: name.into(),
            config,
            clock,
            inner: parking_lot::Mutex::new(Inner {
                state: BreakerState::Closed,
                failure_count: 0,
                half_open_success_count: 0,
                total_calls: 0,
                last_failure_at: None,
                last_state_change_at: now,
                half_open_in_flight: false,
                metrics: BreakerMetrics::default(),
                recent_durations: VecDeque::with_capacity(DURATION_WINDOW),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    pub fn metrics(&self) -> BreakerMetrics {
        self.inner.lock().metrics
    }

    /// Average call duration over the last 100 samples.
    pub fn average_duration(&self) -> Duration {
        let inner = self.inner.lock();
        if inner.recent_durations.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = inner.recent_durations.iter().sum();
        total / inner.recent_durations.len() as u32
    }

    /// Attempt to admit a call. Returns `Err(CircuitOpen)` without running
    /// anything when the breaker is open (or already probing in half-open).
    pub fn acquire(&self, event: &mut Vec<BreakerEvent>) -> Result<Permit, CircuitOpen> {
        let mut inner = self.inner.lock();
        inner.metrics.calls += 1;
        inner.total_calls += 1;

        match inner.state {
            BreakerState::Closed => Ok(Permit { admitted_as_probe: false }),
            BreakerState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|t| self.clock.now().saturating_duration_since(t))
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.config.open_timeout {
                    self.transition(
                        &mut inner,
                        BreakerState::HalfOpen,
                        TransitionReason::OpenTimeoutElapsed,
                        event,
                    );
                    inner.half_open_in_flight = true;
                    Ok(Permit { admitted_as_probe: true })
                } else {
                    let remaining_ms = (self.config.open_timeout - elapsed).as_millis() as u64;
                    inner.metrics.rejections += 1;
                    event.push(BreakerEvent::Rejected {
                        name: self.name.clone(),
                        reason: RejectReason::Open,
                    });
                    Err(CircuitOpen { name: self.name.clone(), remaining_ms })
                }
            }
            BreakerState::HalfOpen => {
                if inner.half_open_in_flight {
                    inner.metrics.rejections += 1;
                    event.push(BreakerEvent::Rejected {
                        name: self.name.clone(),
                        reason: RejectReason::HalfOpenBusy,
                    });
                    Err(CircuitOpen { name: self.name.clone(), remaining_ms: 0 })
                } else {
                    inner.half_open_in_flight = true;
                    Ok(Permit { admitted_as_probe: true })
                }
            }
        }
    }

    /// Report a successful call. `duration` feeds the slow-call penalty and
    /// the rolling average — the caller still receives its own success
    /// value regardless of whether this counts as a slow-call failure.
    pub fn success(&self, permit: Permit, duration: Duration, events: &mut Vec<BreakerEvent>) {
        let mut inner = self.inner.lock();
        record_duration(&mut inner.recent_durations, duration);

        let is_slow = self.config.slow_call_duration_threshold.is_some_and(|t| duration > t);
        if is_slow {
            inner.metrics.slow_calls += 1;
        }

        if permit.admitted_as_probe && inner.state == BreakerState::HalfOpen {
            inner.half_open_in_flight = false;
            if is_slow {
                self.note_failure(&mut inner, events);
                return;
            }
            inner.half_open_success_count += 1;
            inner.metrics.successes += 1;
            events.push(BreakerEvent::Success { name: self.name.clone() });
            if inner.half_open_success_count >= self.config.success_threshold {
                self.transition(
                    &mut inner,
                    BreakerState::Closed,
                    TransitionReason::HalfOpenProbeSucceeded,
                    events,
                );
                inner.failure_count = 0;
                inner.half_open_success_count = 0;
            }
            return;
        }

        inner.metrics.successes += 1;
        events.push(BreakerEvent::Success { name: self.name.clone() });
        if is_slow {
            self.note_failure(&mut inner, events);
        } else {
            inner.failure_count = 0;
        }
    }

    /// Report a failed call.
    pub fn failure(&self, permit: Permit, error: impl Into<String>, events: &mut Vec<BreakerEvent>) {
        let mut inner = self.inner.lock();
        let error = error.into();
        inner.metrics.failures += 1;
        events.push(BreakerEvent::Failure { name: self.name.clone(), error });

        if permit.admitted_as_probe && inner.state == BreakerState::HalfOpen {
            inner.half_open_in_flight = false;
            inner.last_failure_at = Some(self.clock.now());
            self.transition(&mut inner, BreakerState::Open, TransitionReason::HalfOpenProbeFailed, events);
            inner.half_open_success_count = 0;
            return;
        }

        self.note_failure(&mut inner, events);
    }

    fn note_failure(&self, inner: &mut Inner, events: &mut Vec<BreakerEvent>) {
        inner.last_failure_at = Some(self.clock.now());
        inner.failure_count += 1;
        let volume_ok = match self.config.volume_threshold {
            Some(v) => inner.total_calls >= v,
            None => true,
        };
        if inner.failure_count >= self.config.failure_threshold && volume_ok {
            self.transition(inner, BreakerState::Open, TransitionReason::FailureThresholdReached, events);
        }
    }

    fn transition(
        &self,
        inner: &mut Inner,
        to: BreakerState,
        reason: TransitionReason,
        events: &mut Vec<BreakerEvent>,
    ) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        inner.last_state_change_at = self.clock.now();
        inner.metrics.state_changes += 1;
        events.push(BreakerEvent::StateChange {
            name: self.name.clone(),
            from,
            to,
            at_ms: self.clock.epoch_ms(),
            reason,
        });
    }
}

fn record_duration(window: &mut VecDeque<Duration>, d: Duration) {
    if window.len() == DURATION_WINDOW {
        window.pop_front();
    }
    window.push_back(d);
}

/// Process-wide by-name registry. Creates breakers on first use;
/// configuration is supplied only at creation time.
pub struct BreakerRegistry<C: Clock> {
    clock: C,
    breakers: parking_lot::Mutex<std::collections::HashMap<String, std::sync::Arc<CircuitBreaker<C>>>>,
}

impl<C: Clock> BreakerRegistry<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, breakers: parking_lot::Mutex::new(std::collections::HashMap::new()) }
    }

    /// Get the named breaker, creating it with `config` if it doesn't exist.
    pub fn get_or_create(&self, name: &str, config: BreakerConfig) -> std::sync::Arc<CircuitBreaker<C>> {
        let mut breakers = self.breakers.lock();
        breakers
            .entry(name.to_string())
            .or_insert_with(|| std::sync::Arc::new(CircuitBreaker::new(name, config, self.clock.clone())))
            .clone()
    }

    /// Remove a breaker, detaching any listeners that held its handle.
    pub fn remove(&self, name: &str) {
        self.breakers.lock().remove(name);
    }
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
