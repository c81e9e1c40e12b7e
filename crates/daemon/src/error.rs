// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use foreman_core::WorkerId;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("worker {0} not found")]
    NotFound(WorkerId),

    #[error("worker {0} has already reached a terminal state")]
    AlreadyTerminal(WorkerId),

    #[error("worker {0} is not awaiting review")]
    IllegalTransition(WorkerId),

    #[error("a live worker with the same project and label already exists")]
    Duplicate,

    #[error("depends_on names unknown worker {0}")]
    UnknownDependency(WorkerId),

    #[error("depends_on lists more than {0} entries ({1})")]
    TooManyDependencies(usize, usize),

    #[error("parent_worker_id names unknown worker {0}")]
    UnknownParent(WorkerId),

    #[error("input payload is empty")]
    EmptyInput,

    #[error("input payload of {0} bytes exceeds the {1} byte limit")]
    InputTooLarge(usize, usize),

    #[error("invalid project path: {0}")]
    InvalidProjectPath(String),

    #[error("worker {0} does not run in ralph mode")]
    NotRalphMode(WorkerId),

    #[error("ralph token mismatch for worker {0}")]
    RalphTokenMismatch(WorkerId),

    #[error("label rejected: {0}")]
    InvalidLabel(#[from] foreman_core::LabelError),

    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    #[error("at capacity: {0} workers already running")]
    CapacityExceeded(usize),

    #[error("spawn admission rejected: {0}")]
    CircuitOpen(#[from] foreman_core::CircuitOpen),

    #[error("session error: {0}")]
    Session(#[from] crate::session::SessionError),

    #[error("storage error: {0}")]
    Storage(#[from] foreman_storage::StorageError),
}
