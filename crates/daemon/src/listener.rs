// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Unix domain socket surface: newline-delimited JSON framing of
//! [`foreman_wire::Request`]/[`foreman_wire::Response`], bound only once
//! startup rehydration (`crate::startup`) has finished.

use foreman_wire::{ErrorCode, ErrorResponse, Request, Response, SettingsRequest};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::RegistryError;
use crate::registry::{Registry, SpawnRequest};
use crate::session::SessionAdapter;

pub struct Listener<S: SessionAdapter> {
    socket_path: PathBuf,
    registry: Arc<Registry<S>>,
}

impl<S: SessionAdapter> Listener<S> {
    pub fn new(socket_path: PathBuf, registry: Arc<Registry<S>>) -> Self {
        Self { socket_path, registry }
    }

    /// Bind and serve until `shutdown` fires. Any existing socket file at
    /// `socket_path` is unlinked first -- the [`crate::PidLock`] held for
    /// the process's lifetime is what actually prevents two daemons
    /// racing on the same state directory.
    pub async fn run(self, shutdown: CancellationToken) -> std::io::Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        info!(path = %self.socket_path.display(), "listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _addr) = accepted?;
                    let registry = self.registry.clone();
                    let conn_shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, registry, conn_shutdown).await {
                            warn!(error = %e, "connection ended with an error");
                        }
                    });
                }
                _ = shutdown.cancelled() => {
                    info!("listener shutting down");
                    break;
                }
            }
        }
        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }
}

async fn handle_connection<S: SessionAdapter>(
    stream: UnixStream,
    registry: Arc<Registry<S>>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let response = match serde_json::from_str::<Request>(&line) {
                    Ok(Request::Subscribe { project, worker_id, since_seq }) => {
                        return stream_events(&registry, project, worker_id, since_seq, write_half, shutdown).await;
                    }
                    Ok(request) => dispatch(&registry, request).await,
                    Err(e) => Response::error(ErrorCode::InvalidRequest, e.to_string()),
                };
                write_response(&mut write_half, &response).await?;
            }
            _ = shutdown.cancelled() => break,
        }
    }
    Ok(())
}

async fn stream_events<S: SessionAdapter>(
    registry: &Arc<Registry<S>>,
    project: Option<String>,
    worker_id: Option<foreman_core::WorkerId>,
    since_seq: Option<u64>,
    mut write_half: tokio::net::unix::OwnedWriteHalf,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    // Subscribe before backfilling, so nothing produced in between is lost
    // to the gap between reading the ring and attaching to live delivery.
    let mut subscription = registry.subscribe();

    if let (Some(id), Some(since)) = (&worker_id, since_seq) {
        if let Ok(chunks) = registry.output_since(id, since) {
            for (seq, bytes) in chunks {
                let event = foreman_core::Event::WorkerOutput { worker_id: id.clone(), seq, bytes };
                write_response(&mut write_half, &Response::Event(event)).await?;
            }
        }
    }

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                if let Some(id) = &worker_id {
                    if event.worker_id() != id {
                        continue;
                    }
                } else if let Some(p) = &project {
                    let matches = registry.get(event.worker_id()).is_some_and(|w| &w.project == p);
                    if !matches {
                        continue;
                    }
                }
                write_response(&mut write_half, &Response::Event(event)).await?;
            }
            _ = shutdown.cancelled() => break,
        }
    }
    Ok(())
}

async fn write_response(write_half: &mut (impl AsyncWriteExt + Unpin), response: &Response) -> std::io::Result<()> {
    let mut line = serde_json::to_string(response).unwrap_or_else(|_| "{\"type\":\"error\"}".to_string());
    line.push('\n');
    write_half.write_all(line.as_bytes()).await
}

async fn dispatch<S: SessionAdapter>(registry: &Registry<S>, request: Request) -> Response {
    let result = match request {
        Request::Spawn(req) => handle_spawn(registry, req).await.map(Response::Worker),
        Request::Get { worker_id } => registry
            .get(&worker_id)
            .map(Response::Worker)
            .ok_or(RegistryError::NotFound(worker_id)),
        Request::List { project } => Ok(Response::Workers(registry.list(project.as_deref()))),
        Request::Patch(req) => match req.label {
            Some(label) => registry.patch_label(&req.worker_id, label).await.map(Response::Worker),
            None => registry.get(&req.worker_id).map(Response::Worker).ok_or(RegistryError::NotFound(req.worker_id)),
        },
        Request::SendInput { worker_id, input } => {
            registry.send_input(&worker_id, &input).await.map(|_| Response::Ok)
        }
        Request::Settings(req) => handle_settings(registry, req).await.map(Response::Worker),
        Request::Complete { worker_id } => registry.complete(&worker_id).await.map(Response::Worker),
        Request::RalphSignal { worker_id, ralph_token } => {
            registry.ralph_signal(&worker_id, &ralph_token).await.map(Response::Worker)
        }
        Request::Dismiss { worker_id } => registry.dismiss(&worker_id).await.map(Response::Worker),
        Request::Kill { worker_id, force } => registry.kill(&worker_id, force).await.map(Response::Worker),
        Request::Children { worker_id } => Ok(Response::Workers(registry.children(&worker_id))),
        Request::Siblings { worker_id } => Ok(Response::Workers(registry.siblings(&worker_id))),
        Request::Dependencies { worker_id } => Ok(Response::Workers(registry.dependencies(&worker_id))),
        Request::Tail { worker_id } => registry.tail(&worker_id).map(|bytes| Response::Output { bytes }),
        Request::History { worker_id, offset, limit } => {
            registry.history(&worker_id, offset, limit).map(|bytes| Response::Output { bytes })
        }
        Request::Templates => Ok(Response::Templates(
            crate::templates::CATALOG
                .iter()
                .map(|t| foreman_wire::TemplateInfo { name: t.name.to_string(), description: t.description.to_string() })
                .collect(),
        )),
        Request::SpawnFromTemplate(req) => registry
            .spawn_from_template(&req.template, req.label, req.project, req.task)
            .await
            .map(Response::Worker),
        Request::ListCheckpoints => Ok(Response::Checkpoints(registry.list_checkpoints())),
        Request::Health => Ok(Response::Health { status: "ok".to_string() }),
        // The connection loop intercepts `Subscribe` before it reaches
        // `dispatch`; a client that sends it again on an already-streaming
        // connection gets a normal error instead of the connection dying.
        Request::Subscribe { .. } => {
            return Response::Error(ErrorResponse {
                code: ErrorCode::InvalidRequest,
                message: "subscribe must be the first message on a connection".to_string(),
            });
        }
    };

    result.unwrap_or_else(to_error_response)
}

async fn handle_spawn<S: SessionAdapter>(registry: &Registry<S>, req: foreman_wire::SpawnRequest) -> Result<foreman_core::Worker, RegistryError> {
    registry
        .spawn(SpawnRequest {
            label: req.label,
            project: req.project,
            command: req.command,
            args: req.args,
            cwd: req.cwd.map(std::path::PathBuf::from),
            depends_on: req.depends_on,
            parent_worker_id: req.parent_worker_id,
            ralph_mode: req.ralph_mode,
            initial_input: req.initial_input,
            allow_duplicate: req.allow_duplicate,
            auto_accept: req.auto_accept,
            task: req.task,
        })
        .await
}

async fn handle_settings<S: SessionAdapter>(registry: &Registry<S>, req: SettingsRequest) -> Result<foreman_core::Worker, RegistryError> {
    registry.settings(&req.worker_id, req.auto_accept, req.auto_accept_paused).await
}

fn to_error_response(error: RegistryError) -> Response {
    let code = match &error {
        RegistryError::NotFound(_) => ErrorCode::NotFound,
        RegistryError::AlreadyTerminal(_) => ErrorCode::AlreadyTerminal,
        RegistryError::IllegalTransition(_) => ErrorCode::IllegalTransition,
        RegistryError::Duplicate
        | RegistryError::UnknownDependency(_)
        | RegistryError::TooManyDependencies(_, _)
        | RegistryError::UnknownParent(_)
        | RegistryError::EmptyInput
        | RegistryError::InputTooLarge(_, _)
        | RegistryError::InvalidProjectPath(_)
        | RegistryError::NotRalphMode(_)
        | RegistryError::RalphTokenMismatch(_)
        | RegistryError::InvalidLabel(_)
        | RegistryError::UnknownTemplate(_) => ErrorCode::InvalidRequest,
        RegistryError::CapacityExceeded(_) | RegistryError::CircuitOpen(_) => ErrorCode::CapacityExceeded,
        RegistryError::Session(_) | RegistryError::Storage(_) => ErrorCode::Internal,
    };
    Response::Error(ErrorResponse { code, message: error.to_string() })
}
