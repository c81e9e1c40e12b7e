// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use std::time::Duration;

fn breaker(config: BreakerConfig) -> (CircuitBreaker<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    (CircuitBreaker::new("svc", config, clock.clone()), clock)
}

#[test]
fn closed_success_resets_failure_count() {
    let (b, _clock) = breaker(BreakerConfig { failure_threshold: 2, ..Default::default() });
    let mut events = vec![];
    let p = b.acquire(&mut events).unwrap();
    b.failure(p, "boom", &mut events);
    assert_eq!(b.state(), BreakerState::Closed);
    let p = b.acquire(&mut events).unwrap();
    b.success(p, Duration::from_millis(1), &mut events);
    assert_eq!(b.state(), BreakerState::Closed);
}

#[test]
fn opens_after_failure_threshold() {
    let (b, _clock) = breaker(BreakerConfig { failure_threshold: 2, ..Default::default() });
    let mut events = vec![];
    for _ in 0..2 {
        let p = b.acquire(&mut events).unwrap();
        b.failure(p, "boom", &mut events);
    }
    assert_eq!(b.state(), BreakerState::Open);
    assert!(events.iter().any(|e| matches!(e, BreakerEvent::StateChange { to: BreakerState::Open, .. })));
}

#[test]
fn open_rejects_immediately_with_remaining_ms() {
    let (b, _clock) = breaker(BreakerConfig {
        failure_threshold: 1,
        open_timeout: Duration::from_millis(100),
        ..Default::default()
    });
    let mut events = vec![];
    let p = b.acquire(&mut events).unwrap();
    b.failure(p, "boom", &mut events);
    assert_eq!(b.state(), BreakerState::Open);

    let err = b.acquire(&mut events).unwrap_err();
    assert_eq!(err.name, "svc");
    assert!(err.remaining_ms > 0 && err.remaining_ms <= 100);
}

#[test]
fn volume_threshold_blocks_premature_open() {
    let (b, _clock) = breaker(BreakerConfig {
        failure_threshold: 1,
        volume_threshold: Some(5),
        ..Default::default()
    });
    let mut events = vec![];
    let p = b.acquire(&mut events).unwrap();
    b.failure(p, "boom", &mut events);
    assert_eq!(b.state(), BreakerState::Closed);
}

#[test]
fn slow_success_counts_as_failure_but_caller_still_sees_success() {
    let (b, _clock) = breaker(BreakerConfig {
        failure_threshold: 1,
        slow_call_duration_threshold: Some(Duration::from_millis(10)),
        ..Default::default()
    });
    let mut events = vec![];
    let p = b.acquire(&mut events).unwrap();
    b.success(p, Duration::from_millis(50), &mut events);
    assert_eq!(b.state(), BreakerState::Open);
    assert!(events.iter().any(|e| matches!(e, BreakerEvent::Success { .. })));
}

#[test]
fn scenario_half_open_probe_then_close() {
    // spec.md scenario 5: failureThreshold=2, successThreshold=2, openTimeout=100ms
    let (b, clock) = breaker(BreakerConfig {
        failure_threshold: 2,
        success_threshold: 2,
        open_timeout: Duration::from_millis(100),
        ..Default::default()
    });
    let mut events = vec![];
    for _ in 0..2 {
        let p = b.acquire(&mut events).unwrap();
        b.failure(p, "boom", &mut events);
    }
    assert_eq!(b.state(), BreakerState::Open);

    clock.advance(Duration::from_millis(150));

    let probe = b.acquire(&mut events).expect("probe should be admitted");
    assert_eq!(b.state(), BreakerState::HalfOpen);

    let rejected = b.acquire(&mut events).unwrap_err();
    assert_eq!(rejected.remaining_ms, 0);

    b.success(probe, Duration::from_millis(1), &mut events);
    assert_eq!(b.state(), BreakerState::HalfOpen);

    let second = b.acquire(&mut events).unwrap();
    b.success(second, Duration::from_millis(1), &mut events);
    assert_eq!(b.state(), BreakerState::Closed);
}

#[test]
fn half_open_failure_reopens_and_restarts_timer() {
    let (b, clock) = breaker(BreakerConfig {
        failure_threshold: 1,
        open_timeout: Duration::from_millis(100),
        ..Default::default()
    });
    let mut events = vec![];
    let p = b.acquire(&mut events).unwrap();
    b.failure(p, "boom", &mut events);
    clock.advance(Duration::from_millis(150));
    let probe = b.acquire(&mut events).unwrap();
    b.failure(probe, "boom again", &mut events);
    assert_eq!(b.state(), BreakerState::Open);

    let err = b.acquire(&mut events).unwrap_err();
    assert!(err.remaining_ms > 0);
}

#[test]
fn registry_returns_same_instance_for_name() {
    let clock = FakeClock::new();
    let registry = BreakerRegistry::new(clock);
    let a = registry.get_or_create("svc", BreakerConfig::default());
    let b = registry.get_or_create("svc", BreakerConfig::default());
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}

#[test]
fn registry_remove_detaches_entry() {
    let clock = FakeClock::new();
    let registry = BreakerRegistry::new(clock);
    let a = registry.get_or_create("svc", BreakerConfig::default());
    registry.remove("svc");
    let b = registry.get_or_create("svc", BreakerConfig::default());
    assert!(!std::sync::Arc::ptr_eq(&a, &b));
}
