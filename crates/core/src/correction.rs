// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data types for the correction loop engine. The loop driver itself lives
//! in `foreman-daemon`, since running it requires I/O (the producer and the
//! verification tools); this module holds only the pure, testable pieces:
//! task-type policy, critique normalisation, and stagnation detection.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

crate::simple_display! {
    TaskType {
        Code => "code",
        Factual => "factual",
        Reasoning => "reasoning",
        Format => "format",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Code,
    Factual,
    Reasoning,
    Format,
}

impl TaskType {
    /// Per-task-type max iterations, `spec.md` §4.6.
    pub fn max_iterations(self) -> u32 {
        match self {
            Self::Code => 5,
            Self::Reasoning => 3,
            Self::Factual => 3,
            Self::Format => 2,
        }
    }
}

/// Confidence threshold for early acceptance.
pub const CONFIDENCE_THRESHOLD: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A structured finding about an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Critique {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Normalise a critique message for stagnation comparison: lower-case,
/// digits collapsed to `N`, quoted literals stripped.
pub fn normalize_message(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut in_quote: Option<char> = None;
    let mut prev_was_digit = false;
    for ch in message.chars() {
        if let Some(q) = in_quote {
            if ch == q {
                in_quote = None;
            }
            continue;
        }
        if ch == '"' || ch == '\'' {
            in_quote = Some(ch);
            continue;
        }
        if ch.is_ascii_digit() {
            if !prev_was_digit {
                out.push('N');
            }
            prev_was_digit = true;
            continue;
        }
        prev_was_digit = false;
        out.extend(ch.to_lowercase());
    }
    out
}

/// The identity of a critique for stagnation comparison: `(type, message)`
/// after normalisation.
pub type CritiqueKey = (String, String);

pub fn critique_key(c: &Critique) -> CritiqueKey {
    (c.kind.to_lowercase(), normalize_message(&c.message))
}

pub fn critique_set(critiques: &[Critique]) -> HashSet<CritiqueKey> {
    critiques.iter().map(critique_key).collect()
}

/// True when the loop has stagnated: the current critique set is a
/// non-empty subset of the previous iteration's.
pub fn is_stagnant(current: &[Critique], previous: &[Critique]) -> bool {
    if previous.is_empty() {
        return false;
    }
    let prev_set = critique_set(previous);
    let cur_set = critique_set(current);
    cur_set.is_subset(&prev_set)
}

/// Outcome of a single verification pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub valid: bool,
    pub critiques: Vec<Critique>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl Verification {
    /// `valid = (no error-severity critique)`.
    pub fn from_critiques(critiques: Vec<Critique>, confidence: f64, evidence: Option<String>) -> Self {
        let valid = !critiques.iter().any(|c| c.severity == Severity::Error);
        Self { valid, critiques, confidence, evidence }
    }
}

/// Aggregate confidence across multiple verification tools: the mean.
pub fn aggregate_confidence(confidences: &[f64]) -> f64 {
    if confidences.is_empty() {
        return 0.0;
    }
    confidences.iter().sum::<f64>() / confidences.len() as f64
}

crate::simple_display! {
    StopReason {
        ValidOutput => "valid_output",
        MaxIterations => "max_iterations",
        NoNewCritiques => "no_new_critiques",
        ConfidenceThreshold => "confidence_threshold",
        ProducerUnavailable => "producer_unavailable",
        VerificationError => "verification_error",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ValidOutput,
    MaxIterations,
    NoNewCritiques,
    ConfidenceThreshold,
    ProducerUnavailable,
    VerificationError,
}

impl StopReason {
    /// `success` iff the final verification reports valid or confidence
    /// reached the threshold.
    pub fn is_success(self) -> bool {
        matches!(self, Self::ValidOutput | Self::ConfidenceThreshold)
    }
}

/// One entry in a correction session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub iteration: u32,
    pub output: String,
    pub verification: Verification,
}

/// Transient, per-invocation correction state.
#[derive(Debug, Clone)]
pub struct CorrectionSession {
    pub task_type: TaskType,
    pub iteration: u32,
    pub history: Vec<HistoryEntry>,
    pub previous_critiques: Vec<Critique>,
    pub last_output: String,
}

impl CorrectionSession {
    pub fn new(task_type: TaskType, initial_output: String) -> Self {
        Self { task_type, iteration: 0, history: Vec::new(), previous_critiques: Vec::new(), last_output: initial_output }
    }

    pub fn record(&mut self, output: String, verification: Verification) {
        self.history.push(HistoryEntry { iteration: self.iteration, output, verification });
    }
}

/// Final return value of a correction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionResult {
    pub success: bool,
    pub final_output: String,
    pub iterations: u32,
    pub remaining_issues: Vec<Critique>,
    pub stop_reason: StopReason,
    pub history: Vec<HistoryEntry>,
    pub confidence: f64,
}

/// A durable, importance-scored lesson synthesised from a failed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reflection {
    pub task_type: TaskType,
    pub project_id: String,
    pub lessons: Vec<String>,
    pub detected_patterns: Vec<DetectedPattern>,
    pub importance: f64,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectedPattern {
    RecurringIssue,
    Degradation,
    Oscillation,
    Stagnation,
}

/// Minimum importance for a reflection to be eligible for retrieval.
pub const MIN_REFLECTION_IMPORTANCE: f64 = 0.3;
/// Maximum reflections injected into a session's context.
pub const MAX_RETRIEVED_REFLECTIONS: usize = 3;
/// Fixed reinforcement boost applied when a retrieved reflection contributed
/// to a successful session.
pub const REFLECTION_REINFORCEMENT_BOOST: f64 = 0.1;

/// Score a reflection's importance from session shape at failure time.
///
/// Scaled by iteration count (more iterations spent => more was learned),
/// remaining issue count (fewer remaining => more useful lesson), and the
/// number of distinct detected patterns and critique categories observed.
pub fn score_importance(
    iterations: u32,
    remaining_issues: usize,
    detected_patterns: &[DetectedPattern],
    distinct_categories: usize,
) -> f64 {
    let iteration_component = (iterations as f64 / 5.0).min(1.0) * 0.4;
    let remaining_component = if remaining_issues == 0 { 0.3 } else { (0.3 / (remaining_issues as f64 + 1.0)).min(0.3) };
    let pattern_component = (detected_patterns.len() as f64 / 4.0).min(1.0) * 0.2;
    let category_component = (distinct_categories as f64 / 4.0).min(1.0) * 0.1;
    (iteration_component + remaining_component + pattern_component + category_component).clamp(0.0, 1.0)
}

#[cfg(test)]
#[path = "correction_tests.rs"]
mod tests;
