// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervises the detachable terminal session behind each worker: a
//! long-lived subprocess the registry can attach to, feed input, and tear
//! down independently of the orchestrator's own lifetime.

use async_trait::async_trait;
use foreman_core::WorkerId;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("worker {0} has no active session")]
    NotFound(WorkerId),

    #[error("failed to spawn session for worker {0}: {1}")]
    SpawnFailed(WorkerId, String),

    #[error("session for worker {0} is no longer alive")]
    Dead(WorkerId),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub worker_id: WorkerId,
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

/// A line of output produced by a session, tagged with its worker for the
/// daemon's demultiplexing loop.
#[derive(Debug, Clone)]
pub struct SessionOutput {
    pub worker_id: WorkerId,
    pub bytes: Vec<u8>,
}

/// Supervises one worker's subprocess. Implementations other than
/// [`ProcessSessionAdapter`] (e.g. a mock for tests) only need to honor this
/// contract, not its concrete mechanism.
#[async_trait]
pub trait SessionAdapter: Send + Sync + 'static {
    async fn spawn(&self, config: SessionConfig, output_tx: mpsc::UnboundedSender<SessionOutput>) -> Result<(), SessionError>;
    async fn send_input(&self, worker_id: &WorkerId, input: &[u8]) -> Result<(), SessionError>;
    async fn kill(&self, worker_id: &WorkerId, force: bool) -> Result<(), SessionError>;
    async fn is_alive(&self, worker_id: &WorkerId) -> bool;
}

struct Session {
    child: Child,
    stdin: tokio::process::ChildStdin,
}

/// Real subprocess-backed implementation, one OS process per worker.
#[derive(Default)]
pub struct ProcessSessionAdapter {
    sessions: tokio::sync::Mutex<std::collections::HashMap<WorkerId, Session>>,
}

impl ProcessSessionAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionAdapter for ProcessSessionAdapter {
    async fn spawn(&self, config: SessionConfig, output_tx: mpsc::UnboundedSender<SessionOutput>) -> Result<(), SessionError> {
        let mut command = Command::new(&config.command);
        command.args(&config.args).stdin(std::process::Stdio::piped()).stdout(std::process::Stdio::piped()).stderr(std::process::Stdio::piped());
        if let Some(cwd) = &config.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|e| SessionError::SpawnFailed(config.worker_id.clone(), e.to_string()))?;
        let stdin = child.stdin.take().ok_or_else(|| SessionError::SpawnFailed(config.worker_id.clone(), "no stdin".into()))?;
        let stdout = child.stdout.take().ok_or_else(|| SessionError::SpawnFailed(config.worker_id.clone(), "no stdout".into()))?;

        let worker_id = config.worker_id.clone();
        let tx = output_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let mut bytes = line.into_bytes();
                bytes.push(b'\n');
                if tx.send(SessionOutput { worker_id: worker_id.clone(), bytes }).is_err() {
                    break;
                }
            }
        });

        self.sessions.lock().await.insert(config.worker_id, Session { child, stdin });
        Ok(())
    }

    async fn send_input(&self, worker_id: &WorkerId, input: &[u8]) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(worker_id).ok_or_else(|| SessionError::NotFound(worker_id.clone()))?;
        session.stdin.write_all(input).await.map_err(SessionError::from)
    }

    async fn kill(&self, worker_id: &WorkerId, force: bool) -> Result<(), SessionError> {
        let mut session = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(worker_id).ok_or_else(|| SessionError::NotFound(worker_id.clone()))?
        };
        if force {
            session.child.kill().await.map_err(SessionError::from)?;
        } else {
            drop(session.stdin); // EOF on stdin; the child exits on its own
            let _ = session.child.wait().await;
        }
        Ok(())
    }

    async fn is_alive(&self, worker_id: &WorkerId) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(worker_id) {
            Some(session) => matches!(session.child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
