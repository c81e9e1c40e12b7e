// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! foreman-core: pure data model and algorithms for the foreman orchestrator.
//!
//! This crate has no I/O. It holds the worker record, the circuit breaker,
//! the error classifier, the correction-loop data types, checkpoints, and
//! the event types the daemon fans out — everything that can be unit
//! tested without a runtime.

pub mod breaker;
pub mod checkpoint;
pub mod classifier;
pub mod clock;
pub mod correction;
pub mod event;
pub mod macros;
pub mod worker;

pub use breaker::{
    BreakerConfig, BreakerEvent, BreakerMetrics, BreakerRegistry, BreakerState, CircuitBreaker,
    CircuitOpen, Permit, RejectReason, TransitionReason,
};
pub use checkpoint::Checkpoint;
pub use classifier::{
    calculate_backoff, classify, sample_jitter, select_recovery_action, BackoffConfig,
    EscalateReason, ErrorClass, ErrorInput, FormatHints, RecoveryAction, RecoveryInput,
    RepromptConstraints,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use correction::{
    aggregate_confidence, critique_key, critique_set, is_stagnant, normalize_message,
    score_importance, Critique, CritiqueKey, CorrectionResult, CorrectionSession, DetectedPattern,
    HistoryEntry, Reflection, Severity, StopReason, TaskType, Verification,
    CONFIDENCE_THRESHOLD, MAX_RETRIEVED_REFLECTIONS, MIN_REFLECTION_IMPORTANCE,
    REFLECTION_REINFORCEMENT_BOOST,
};
pub use event::Event;
pub use worker::{
    is_valid_id, validate_label, Health, LabelError, RalphToken, Task, Worker, WorkerId,
    WorkerStatus, MAX_DEPENDS_ON, MAX_INPUT_BYTES, MAX_LABEL_LEN,
};
