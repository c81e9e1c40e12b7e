// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The central entity: a supervised long-lived interactive subprocess.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Maximum accepted label length, in bytes.
pub const MAX_LABEL_LEN: usize = 200;
/// Maximum number of dependency edges a single worker may declare.
pub const MAX_DEPENDS_ON: usize = 50;
/// Maximum accepted size for `initialInput` / `sendInput` payloads.
pub const MAX_INPUT_BYTES: usize = 1024 * 1024;

/// Unique identifier for a worker instance.
///
/// External format is fixed: exactly 8 lowercase hex characters, stable for
/// the worker's lifetime and unique process-wide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub String);

impl WorkerId {
    /// Wrap an existing string without validating its shape.
    ///
    /// Used when parsing ids that came from a trusted internal source
    /// (persisted state, a previously-validated request). Callers taking
    /// ids from an external caller should use [`WorkerId::parse`] instead.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id matching the external format.
    pub fn generate() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let id: String = (0..8).map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0')).collect();
        Self(id)
    }

    /// Parse and validate an id against `^[a-f0-9]{8}$`.
    pub fn parse(id: &str) -> Option<Self> {
        if is_valid_id(id) {
            Some(Self(id.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Check that an id string matches the external format `^[a-f0-9]{8}$`.
pub fn is_valid_id(id: &str) -> bool {
    id.len() == 8 && id.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WorkerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for WorkerId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for WorkerId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for WorkerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

crate::simple_display! {
    WorkerStatus {
        Pending => "pending",
        Running => "running",
        AwaitingReview => "awaiting_review",
        Completed => "completed",
        Crashed => "crashed",
        Killed => "killed",
    }
}

/// Lifecycle status of a worker.
///
/// `Completed`, `Crashed`, and `Killed` are terminal: once reached, a
/// worker never transitions back to `Running` or `AwaitingReview`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Pending,
    Running,
    AwaitingReview,
    Completed,
    Crashed,
    Killed,
}

impl WorkerStatus {
    /// Terminal states never transition further.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Crashed | Self::Killed)
    }

    /// Terminal-success, as used by dependency gating (`spec.md` §4.4).
    pub fn is_terminal_success(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Terminal-failure, as used by dependency gating.
    pub fn is_terminal_failure(self) -> bool {
        matches!(self, Self::Crashed | Self::Killed)
    }
}

crate::simple_display! {
    Health {
        Starting => "starting",
        Healthy => "healthy",
        Degraded => "degraded",
        Unhealthy => "unhealthy",
        Dead => "dead",
    }
}

/// Health as observed by the periodic poller. Independent of `WorkerStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Starting,
    Healthy,
    Degraded,
    Unhealthy,
    Dead,
}

/// Optional task metadata attached at spawn time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// A 128-bit completion-signalling secret for `ralphMode` workers.
///
/// Generated server-side at spawn time, persisted alongside the worker
/// record, and read only by the registry itself — never returned over the
/// external surface. See [`Worker::ralph_token`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RalphToken(String);

impl RalphToken {
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The central entity: a supervised long-lived interactive subprocess
/// together with its orchestrator-side record.
///
/// The full record, including `ralph_token`, is what gets persisted to the
/// durable store. [`Worker::strip_secret`] produces the externally-visible
/// view used by every response and event payload — see `spec.md` §7's
/// "the `ralphToken` field is *never* included in any response."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub label: String,
    pub project: String,
    pub status: WorkerStatus,
    pub health: Health,
    pub auto_accept: bool,
    pub auto_accept_paused: bool,
    pub depends_on: Vec<WorkerId>,
    pub parent_worker_id: Option<WorkerId>,
    pub parent_label: Option<String>,
    pub child_worker_ids: Vec<WorkerId>,
    pub ralph_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ralph_token: Option<RalphToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crashed_at_ms: Option<u64>,
}

impl Worker {
    /// When this worker reached whichever terminal state it's in, if any.
    pub fn terminal_at_ms(&self) -> Option<u64> {
        self.completed_at_ms.or(self.crashed_at_ms)
    }

    /// Strip the `ralph_token` in place. Call before any external response
    /// or event payload is constructed from this record.
    pub fn strip_secret(mut self) -> Self {
        self.ralph_token = None;
        self
    }
}

/// Validate a label: 1-200 bytes, no control characters (bytes 0-31 or 127).
pub fn validate_label(label: &str) -> Result<(), LabelError> {
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return Err(LabelError::BadLength(label.len()));
    }
    if label.bytes().any(|b| b < 32 || b == 127) {
        return Err(LabelError::ControlChar);
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("label length {0} bytes is outside [1, {MAX_LABEL_LEN}]")]
    BadLength(usize),
    #[error("label contains a control character")]
    ControlChar,
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
