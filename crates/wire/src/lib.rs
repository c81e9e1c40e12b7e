// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! foreman-wire: request/response envelope types for the daemon's Unix
//! socket protocol. No transport or routing code lives here — see
//! `foreman-daemon::listener` for the newline-delimited JSON framing and
//! dispatch that uses these types.

use foreman_core::{Checkpoint, Event, Task, Worker, WorkerId};
use serde::{Deserialize, Serialize};

/// One request frame sent by a client over the daemon's Unix socket.
///
/// Every field that names an operation from `spec.md` §6 appears here;
/// transport/auth concerns are deliberately absent (see `spec.md`'s
/// Non-goals).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Request {
    Spawn(SpawnRequest),
    Get { worker_id: WorkerId },
    List { project: Option<String> },
    Patch(PatchRequest),
    SendInput { worker_id: WorkerId, input: Vec<u8> },
    Settings(SettingsRequest),
    Complete { worker_id: WorkerId },
    RalphSignal { worker_id: WorkerId, ralph_token: String },
    Dismiss { worker_id: WorkerId },
    Kill { worker_id: WorkerId, force: bool },
    Children { worker_id: WorkerId },
    Siblings { worker_id: WorkerId },
    Dependencies { worker_id: WorkerId },
    Tail { worker_id: WorkerId },
    History { worker_id: WorkerId, offset: usize, limit: usize },
    Templates,
    SpawnFromTemplate(SpawnFromTemplateRequest),
    ListCheckpoints,
    Health,
    /// Open the event fan-out. `worker_id` + `since_seq` together resume an
    /// output stream across a reconnect: the daemon first replays any
    /// retained chunks with `seq > since_seq` for that worker, then
    /// switches to live delivery (`spec.md` §6, "Streaming surface").
    Subscribe { project: Option<String>, worker_id: Option<WorkerId>, since_seq: Option<u64> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub label: String,
    pub project: String,
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<String>,
    pub depends_on: Vec<WorkerId>,
    pub parent_worker_id: Option<WorkerId>,
    pub ralph_mode: bool,
    pub initial_input: Option<Vec<u8>>,
    #[serde(default)]
    pub allow_duplicate: bool,
    #[serde(default)]
    pub auto_accept: Option<bool>,
    #[serde(default)]
    pub task: Option<Task>,
}

/// Body of `POST /workers/spawn-from-template` (`spec.md` §6): a named
/// catalog entry (see `foreman_daemon::templates`) plus the free-text task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnFromTemplateRequest {
    pub template: String,
    pub label: String,
    pub project: String,
    pub task: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRequest {
    pub worker_id: WorkerId,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsRequest {
    pub worker_id: WorkerId,
    pub auto_accept: Option<bool>,
    pub auto_accept_paused: Option<bool>,
}

/// One response frame, always sent in answer to exactly one [`Request`],
/// except for `Event`, which streams asynchronously after a `Subscribe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    Worker(Worker),
    Workers(Vec<Worker>),
    Ok,
    Output { bytes: Vec<u8> },
    Checkpoints(Vec<Checkpoint>),
    Templates(Vec<TemplateInfo>),
    Health { status: String },
    Event(Event),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    InvalidRequest,
    IllegalTransition,
    AlreadyTerminal,
    CapacityExceeded,
    Internal,
}

impl Response {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorResponse { code, message: message.into() })
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
