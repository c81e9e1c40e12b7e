// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tiered error classification and recovery-action selection.
//!
//! Stateless modulo metrics counters kept by the caller; this module itself
//! holds no persistent state.

use std::time::Duration;

const TRANSIENT_CODES: &[&str] =
    &["ECONNRESET", "ETIMEDOUT", "ECONNREFUSED", "ENOTFOUND", "EAI_AGAIN"];
const TRANSIENT_HTTP: &[u16] = &[429, 500, 502, 503, 504];
const TRANSIENT_PATTERNS: &[&str] = &[
    "rate limit",
    "too many requests",
    "temporarily unavailable",
    "service unavailable",
    "timeout",
    "connection reset",
    "network error",
    "overloaded",
];

const RECOVERABLE_CODES: &[&str] = &["CONTEXT_OVERFLOW", "VALIDATION_FAILED", "TOKEN_LIMIT", "TOOL_ERROR"];
const RECOVERABLE_HTTP: &[u16] = &[400, 413, 422];
const RECOVERABLE_PATTERNS: &[&str] = &[
    "context overflow",
    "token limit",
    "validation failed",
    "invalid format",
    "tool error",
    "content too large",
];

const FATAL_CODES: &[&str] = &["EAUTH", "QUOTA_EXCEEDED", "INVALID_API_KEY", "PERMISSION_DENIED"];
const FATAL_HTTP: &[u16] = &[401, 403];
const FATAL_PATTERNS: &[&str] = &[
    "authentication failed",
    "unauthorized",
    "forbidden",
    "quota exceeded",
    "billing",
    "invalid api key",
    "access denied",
    "account suspended",
];

/// The extracted shape of an arbitrary failure, ready for classification.
#[derive(Debug, Clone, Default)]
pub struct ErrorInput {
    pub code: Option<String>,
    pub http_status: Option<u16>,
    pub message: String,
}

crate::simple_display! {
    ErrorClass {
        Transient => "transient",
        Recoverable => "recoverable",
        Fatal => "fatal",
        Unknown => "unknown",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Recoverable,
    Fatal,
    Unknown,
}

fn matches_tier(input: &ErrorInput, codes: &[&str], statuses: &[u16], patterns: &[&str]) -> bool {
    if let Some(code) = &input.code {
        if codes.iter().any(|c| c.eq_ignore_ascii_case(code)) {
            return true;
        }
    }
    if let Some(status) = input.http_status {
        if statuses.contains(&status) {
            return true;
        }
    }
    let lower = input.message.to_lowercase();
    patterns.iter().any(|p| lower.contains(p))
}

/// Classify an error. Match order is transient, then fatal, then
/// recoverable; first match wins. Anything matching none of the tiers is
/// `Unknown`.
pub fn classify(input: &ErrorInput) -> ErrorClass {
    if matches_tier(input, TRANSIENT_CODES, TRANSIENT_HTTP, TRANSIENT_PATTERNS) {
        ErrorClass::Transient
    } else if matches_tier(input, FATAL_CODES, FATAL_HTTP, FATAL_PATTERNS) {
        ErrorClass::Fatal
    } else if matches_tier(input, RECOVERABLE_CODES, RECOVERABLE_HTTP, RECOVERABLE_PATTERNS) {
        ErrorClass::Recoverable
    } else {
        ErrorClass::Unknown
    }
}

/// Backoff parameters for `retry` actions. See [`calculate_backoff`].
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub base: Duration,
    pub multiplier: f64,
    pub max: Duration,
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            multiplier: 2.0,
            max: Duration::from_secs(30),
            jitter_factor: 0.2,
        }
    }
}

/// `delay = min(base * multiplier^attempt, max)` with additive jitter drawn
/// uniformly from `[-jitterFactor*delay, +jitterFactor*delay]`, clamped to
/// be non-negative.
pub fn calculate_backoff(config: &BackoffConfig, attempt: u32, jitter_sample: f64) -> Duration {
    debug_assert!((-1.0..=1.0).contains(&jitter_sample));
    let raw_ms = config.base.as_millis() as f64 * config.multiplier.powi(attempt as i32);
    let capped_ms = raw_ms.min(config.max.as_millis() as f64);
    let jitter_ms = capped_ms * config.jitter_factor * jitter_sample;
    let final_ms = (capped_ms + jitter_ms).max(0.0);
    Duration::from_millis(final_ms.round() as u64)
}

/// Sample a jitter fraction in `[-1.0, 1.0]` using a thread-local RNG.
pub fn sample_jitter() -> f64 {
    use rand::Rng;
    rand::thread_rng().gen_range(-1.0..=1.0)
}

/// Format hints derived from the error text, for `reprompt` constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatHints {
    pub require_valid_json: bool,
    pub require_all_required_fields: bool,
    pub enforce_types: bool,
}

/// Constraints attached to a `reprompt` recovery action.
#[derive(Debug, Clone)]
pub struct RepromptConstraints {
    pub hints: FormatHints,
    pub previous_failure: String,
}

fn build_constraints(message: &str) -> RepromptConstraints {
    let lower = message.to_lowercase();
    RepromptConstraints {
        hints: FormatHints {
            require_valid_json: lower.contains("invalid json"),
            require_all_required_fields: lower.contains("missing field"),
            enforce_types: lower.contains("type error"),
        },
        previous_failure: message.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalateReason {
    MaxRetriesExceeded,
    FatalError,
}

/// What the caller should do next, after classifying a failure.
#[derive(Debug, Clone)]
pub enum RecoveryAction {
    Escalate { reason: EscalateReason },
    Retry { delay: Duration },
    CompressContext { delay: Duration },
    Decompose { delay: Duration },
    Reprompt { constraints: RepromptConstraints, delay: Duration },
}

/// Inputs to recovery-action selection.
pub struct RecoveryInput<'a> {
    pub error: &'a ErrorInput,
    pub error_type: ErrorClass,
    pub attempt: u32,
    pub max_retries: u32,
}

/// Decide the recovery action for a classified failure. See `spec.md` §4.2.
pub fn select_recovery_action(
    input: &RecoveryInput<'_>,
    backoff: &BackoffConfig,
    jitter_sample: f64,
) -> RecoveryAction {
    if input.attempt >= input.max_retries {
        return RecoveryAction::Escalate { reason: EscalateReason::MaxRetriesExceeded };
    }
    if input.error_type == ErrorClass::Fatal {
        return RecoveryAction::Escalate { reason: EscalateReason::FatalError };
    }

    let delay = calculate_backoff(backoff, input.attempt, jitter_sample);
    let lower = input.error.message.to_lowercase();

    if input.error_type == ErrorClass::Recoverable {
        if lower.contains("context overflow") {
            return RecoveryAction::CompressContext { delay };
        }
        if lower.contains("token limit") {
            return RecoveryAction::Decompose { delay };
        }
        if lower.contains("validation") {
            return RecoveryAction::Reprompt { constraints: build_constraints(&input.error.message), delay };
        }
        if lower.contains("tool error") {
            return RecoveryAction::Retry { delay };
        }
        // Unmatched recoverable pattern still falls back to retry.
        return RecoveryAction::Retry { delay };
    }

    RecoveryAction::Retry { delay }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
