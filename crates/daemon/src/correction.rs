// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The correction loop driver (`spec.md` §4.6). `foreman_core::correction`
//! holds the pure, testable pieces (task-type policy, stagnation
//! detection); this module wires them to the I/O a real run needs: a
//! producer that revises on critique, a verification pipeline, and an
//! optional reflection memory.

use async_trait::async_trait;
use foreman_core::correction::{
    aggregate_confidence, is_stagnant, score_importance, Critique, CorrectionResult, CorrectionSession,
    DetectedPattern, Reflection, StopReason, TaskType, Verification, CONFIDENCE_THRESHOLD,
    MAX_RETRIEVED_REFLECTIONS, MIN_REFLECTION_IMPORTANCE, REFLECTION_REINFORCEMENT_BOOST,
};

#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("producer unavailable: {0}")]
    Unavailable(String),
}

/// The thing being iteratively revised. `spec.md` deliberately keeps this
/// to one operation: the engine never asks it to self-evaluate.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn send_critique(&self, formatted_critique: &str, context: &str) -> Result<String, ProducerError>;
}

/// External verification, dispatched by task type. Side-effect-free.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, output: &str, task_type: TaskType, context: &str) -> Verification;
}

/// Durable memory of past corrections, consulted before a run and updated
/// after a failed one.
#[async_trait]
pub trait ReflectionStore: Send + Sync {
    async fn retrieve(&self, task_type: TaskType, project_id: &str, limit: usize) -> Vec<Reflection>;
    async fn store(&self, reflection: Reflection);
    async fn reinforce(&self, reflection: &Reflection, boost: f64);
}

/// Render critiques the way the producer expects to read them back.
fn format_critique(critiques: &[Critique]) -> String {
    critiques
        .iter()
        .map(|c| match (&c.location, &c.suggestion) {
            (Some(loc), Some(sug)) => format!("[{}] {} at {}: {} (suggest: {})", c.kind, severity_label(c.severity), loc, c.message, sug),
            (Some(loc), None) => format!("[{}] {} at {}: {}", c.kind, severity_label(c.severity), loc, c.message),
            (None, Some(sug)) => format!("[{}] {}: {} (suggest: {})", c.kind, severity_label(c.severity), c.message, sug),
            (None, None) => format!("[{}] {}: {}", c.kind, severity_label(c.severity), c.message),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn severity_label(s: foreman_core::correction::Severity) -> &'static str {
    use foreman_core::correction::Severity;
    match s {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "info",
    }
}

fn distinct_categories(critiques: &[Critique]) -> usize {
    let mut kinds: Vec<&str> = critiques.iter().map(|c| c.kind.as_str()).collect();
    kinds.sort_unstable();
    kinds.dedup();
    kinds.len()
}

/// Drives one correction run to completion, following the loop body in
/// `spec.md` §4.6 exactly.
pub async fn run<P: Producer, V: Verifier, R: ReflectionStore>(
    producer: &P,
    verifier: &V,
    reflections: Option<&R>,
    task_type: TaskType,
    initial_output: String,
    project_id: &str,
    context: &str,
) -> CorrectionResult {
    let mut preamble = String::new();
    let mut used_reflections: Vec<Reflection> = Vec::new();
    if let Some(store) = reflections {
        let candidates = store.retrieve(task_type, project_id, MAX_RETRIEVED_REFLECTIONS).await;
        for r in candidates.into_iter().filter(|r| r.importance >= MIN_REFLECTION_IMPORTANCE) {
            for lesson in &r.lessons {
                preamble.push_str(lesson);
                preamble.push('\n');
            }
            used_reflections.push(r);
        }
    }
    let context_with_preamble = if preamble.is_empty() { context.to_string() } else { format!("{preamble}\n{context}") };

    let mut session = CorrectionSession::new(task_type, initial_output);
    let max_iterations = task_type.max_iterations();

    let (stop_reason, remaining_issues) = loop {
        session.iteration += 1;
        let verification = verifier.verify(&session.last_output, task_type, &context_with_preamble).await;
        session.record(session.last_output.clone(), verification.clone());

        if verification.valid {
            break (StopReason::ValidOutput, verification.critiques);
        }
        if verification.confidence >= CONFIDENCE_THRESHOLD {
            break (StopReason::ConfidenceThreshold, verification.critiques);
        }
        if session.iteration >= max_iterations {
            break (StopReason::MaxIterations, verification.critiques);
        }
        if is_stagnant(&verification.critiques, &session.previous_critiques) {
            break (StopReason::NoNewCritiques, verification.critiques);
        }

        let formatted = format_critique(&verification.critiques);
        match producer.send_critique(&formatted, &context_with_preamble).await {
            Ok(revised) => session.last_output = revised,
            Err(_) => break (StopReason::ProducerUnavailable, verification.critiques),
        }
        session.previous_critiques = verification.critiques;
    };

    let confidence = aggregate_confidence(&session.history.iter().map(|h| h.verification.confidence).collect::<Vec<_>>());
    let success = stop_reason.is_success();

    if let Some(store) = reflections {
        if success {
            for r in &used_reflections {
                store.reinforce(r, REFLECTION_REINFORCEMENT_BOOST).await;
            }
        } else {
            let patterns = detect_patterns(&session);
            let importance = score_importance(session.iteration, remaining_issues.len(), &patterns, distinct_categories(&remaining_issues));
            let lessons = remaining_issues.iter().map(|c| format!("{}: {}", c.kind, c.message)).collect();
            store
                .store(Reflection {
                    task_type,
                    project_id: project_id.to_string(),
                    lessons,
                    detected_patterns: patterns,
                    importance,
                    created_at_ms: 0,
                })
                .await;
        }
    }

    CorrectionResult {
        success,
        final_output: session.last_output,
        iterations: session.iteration,
        remaining_issues,
        stop_reason,
        history: session.history,
        confidence,
    }
}

/// Patterns named in `spec.md` §4.6: recurring issue, degradation,
/// oscillation, stagnation -- read off the confidence/critique trajectory.
fn detect_patterns(session: &CorrectionSession) -> Vec<DetectedPattern> {
    let mut patterns = Vec::new();
    let confidences: Vec<f64> = session.history.iter().map(|h| h.verification.confidence).collect();
    if confidences.len() >= 2 && confidences.windows(2).all(|w| w[1] <= w[0]) {
        patterns.push(DetectedPattern::Degradation);
    }
    if confidences.len() >= 3 {
        let mut rising = false;
        let mut falling = false;
        for w in confidences.windows(2) {
            if w[1] > w[0] {
                rising = true;
            } else if w[1] < w[0] {
                falling = true;
            }
        }
        if rising && falling {
            patterns.push(DetectedPattern::Oscillation);
        }
    }
    if session.history.len() >= 2 {
        let tail = &session.history[session.history.len() - 2..];
        if is_stagnant(&tail[1].verification.critiques, &tail[0].verification.critiques) {
            patterns.push(DetectedPattern::Stagnation);
        }
    }
    let mut seen_kinds = std::collections::HashSet::new();
    for h in &session.history {
        for c in &h.verification.critiques {
            if !seen_kinds.insert(c.kind.clone()) && !patterns.contains(&DetectedPattern::RecurringIssue) {
                patterns.push(DetectedPattern::RecurringIssue);
            }
        }
    }
    patterns
}

#[cfg(test)]
#[path = "correction_tests.rs"]
mod tests;
