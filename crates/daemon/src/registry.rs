// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker registry: admission control, lifecycle transitions,
//! dependency gating, and persistence wiring (`spec.md` §4.4).
//!
//! `awaiting_review -> completed` has exactly one canonical code path,
//! [`Registry::dismiss`]. The ralph-mode completion signal
//! ([`Registry::complete`]) validates its token, then calls into the same
//! path rather than duplicating the transition.

use foreman_core::{
    BreakerConfig, BreakerRegistry, Checkpoint, Event, Health, RalphToken, SystemClock, Task, Worker,
    WorkerId, WorkerStatus,
};
use foreman_storage::{CheckpointStore, MaterializedState, OutputHistoryStore, OutputRing, Wal};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, Semaphore};

use crate::error::RegistryError;
use crate::fanout::Fanout;
use crate::session::{SessionAdapter, SessionConfig, SessionOutput};

pub struct SpawnRequest {
    pub label: String,
    pub project: String,
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub depends_on: Vec<WorkerId>,
    pub parent_worker_id: Option<WorkerId>,
    pub ralph_mode: bool,
    pub initial_input: Option<Vec<u8>>,
    pub allow_duplicate: bool,
    pub auto_accept: Option<bool>,
    pub task: Option<Task>,
}

/// What it takes to actually start a worker's session, kept around for
/// workers spawned `pending` on a dependency until they're released.
struct PendingCommand {
    command: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    initial_input: Option<Vec<u8>>,
}

pub struct Registry<S: SessionAdapter> {
    state: parking_lot::Mutex<MaterializedState>,
    wal: tokio::sync::Mutex<Wal>,
    fanout: Arc<Fanout>,
    sessions: Arc<S>,
    semaphore: Arc<Semaphore>,
    breakers: BreakerRegistry<SystemClock>,
    breaker_config: BreakerConfig,
    rings: parking_lot::Mutex<HashMap<WorkerId, OutputRing>>,
    history: OutputHistoryStore,
    checkpoints: CheckpointStore,
    ring_buffer_bytes: usize,
    output_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<SessionOutput>>,
    output_tx: mpsc::UnboundedSender<SessionOutput>,
    /// Held for exactly as long as a worker counts against `concurrency_cap`
    /// -- from the moment it becomes `running` until it reaches a terminal
    /// state. Not held while `pending` on a dependency.
    admissions: parking_lot::Mutex<HashMap<WorkerId, tokio::sync::OwnedSemaphorePermit>>,
    pending_commands: parking_lot::Mutex<HashMap<WorkerId, PendingCommand>>,
    template_command: (String, Vec<String>),
    projects_base: PathBuf,
}

impl<S: SessionAdapter> Registry<S> {
    pub fn new(
        wal: Wal,
        initial_state: MaterializedState,
        sessions: Arc<S>,
        fanout: Arc<Fanout>,
        concurrency_cap: usize,
        ring_buffer_bytes: usize,
        breaker_config: BreakerConfig,
        history: OutputHistoryStore,
        checkpoints: CheckpointStore,
        projects_base: PathBuf,
    ) -> Self {
        Self::with_template_command(
            wal,
            initial_state,
            sessions,
            fanout,
            concurrency_cap,
            ring_buffer_bytes,
            breaker_config,
            history,
            checkpoints,
            projects_base,
            ("true".to_string(), Vec::new()),
        )
    }

    /// Same as [`Self::new`], but overriding the command run for
    /// `spawn_from_template` workers (`spec.md` §6's
    /// `POST /workers/spawn-from-template`) instead of the no-op default.
    pub fn with_template_command(
        wal: Wal,
        initial_state: MaterializedState,
        sessions: Arc<S>,
        fanout: Arc<Fanout>,
        concurrency_cap: usize,
        ring_buffer_bytes: usize,
        breaker_config: BreakerConfig,
        history: OutputHistoryStore,
        checkpoints: CheckpointStore,
        projects_base: PathBuf,
        template_command: (String, Vec<String>),
    ) -> Self {
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        Self {
            state: parking_lot::Mutex::new(initial_state),
            wal: tokio::sync::Mutex::new(wal),
            fanout,
            sessions,
            semaphore: Arc::new(Semaphore::new(concurrency_cap)),
            breakers: BreakerRegistry::new(SystemClock),
            breaker_config,
            rings: parking_lot::Mutex::new(HashMap::new()),
            history,
            checkpoints,
            ring_buffer_bytes,
            output_rx: tokio::sync::Mutex::new(output_rx),
            output_tx,
            admissions: parking_lot::Mutex::new(HashMap::new()),
            pending_commands: parking_lot::Mutex::new(HashMap::new()),
            template_command,
            projects_base,
        }
    }

    fn now_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
    }

    async fn persist(&self, event: Event) -> Result<(), RegistryError> {
        self.wal.lock().await.append(&event)?;
        self.state.lock().apply(&event);
        self.fanout.publish(strip_for_fanout(event));
        Ok(())
    }

    pub fn get(&self, id: &WorkerId) -> Option<Worker> {
        self.state.lock().worker(id).cloned().map(Worker::strip_secret)
    }

    pub fn list(&self, project: Option<&str>) -> Vec<Worker> {
        self.state
            .lock()
            .workers()
            .filter(|w| project.map(|p| w.project == p).unwrap_or(true))
            .cloned()
            .map(Worker::strip_secret)
            .collect()
    }

    pub fn children(&self, id: &WorkerId) -> Vec<Worker> {
        self.state.lock().children_of(id).into_iter().cloned().map(Worker::strip_secret).collect()
    }

    pub fn siblings(&self, id: &WorkerId) -> Vec<Worker> {
        self.state.lock().siblings_of(id).into_iter().cloned().map(Worker::strip_secret).collect()
    }

    /// Transitive dependency closure, nearest-first, cycle-safe.
    pub fn dependencies(&self, id: &WorkerId) -> Vec<Worker> {
        let state = self.state.lock();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut frontier = match state.worker(id) {
            Some(w) => w.depends_on.clone(),
            None => return out,
        };
        while let Some(dep_id) = frontier.pop() {
            if !seen.insert(dep_id.clone()) {
                continue;
            }
            if let Some(dep) = state.worker(&dep_id) {
                frontier.extend(dep.depends_on.iter().cloned());
                out.push(dep.clone().strip_secret());
            }
        }
        out
    }

    /// `spawn` with task metadata and the command filled in from a catalog
    /// template instead of the caller, per `spec.md` §6's
    /// `POST /workers/spawn-from-template`.
    pub async fn spawn_from_template(
        &self,
        template: &str,
        label: String,
        project: String,
        task_description: String,
    ) -> Result<Worker, RegistryError> {
        let found = crate::templates::find(template).ok_or_else(|| RegistryError::UnknownTemplate(template.to_string()))?;
        let (command, args) = self.template_command.clone();
        self.spawn(SpawnRequest {
            label,
            project,
            command,
            args,
            cwd: None,
            depends_on: Vec::new(),
            parent_worker_id: None,
            ralph_mode: false,
            initial_input: None,
            allow_duplicate: false,
            auto_accept: None,
            task: Some(Task { description: task_description, task_type: found.name.to_string(), context: None }),
        })
        .await
    }

    pub async fn spawn(&self, req: SpawnRequest) -> Result<Worker, RegistryError> {
        foreman_core::validate_label(&req.label)?;
        if req.depends_on.len() > foreman_core::MAX_DEPENDS_ON {
            return Err(RegistryError::TooManyDependencies(foreman_core::MAX_DEPENDS_ON, req.depends_on.len()));
        }
        if let Some(input) = &req.initial_input {
            if input.len() > foreman_core::MAX_INPUT_BYTES {
                return Err(RegistryError::InputTooLarge(input.len(), foreman_core::MAX_INPUT_BYTES));
            }
        }
        validate_project_path(&self.projects_base, &req.project)?;
        // `spec.md` §4.4: "verify the parent exists (any status)" -- any
        // status, including terminal, is a valid parent.
        let parent_label = match &req.parent_worker_id {
            Some(parent_id) => {
                let label = self.state.lock().worker(parent_id).map(|w| w.label.clone());
                Some(label.ok_or_else(|| RegistryError::UnknownParent(parent_id.clone()))?)
            }
            None => None,
        };
        if !req.allow_duplicate {
            let dupe = self.state.lock().workers().any(|w| {
                !w.status.is_terminal() && w.project == req.project && w.label == req.label
            });
            if dupe {
                return Err(RegistryError::Duplicate);
            }
        }
        let deps_satisfied = {
            let state = self.state.lock();
            let mut all_terminal_success = true;
            for dep in &req.depends_on {
                let dep_worker = state.worker(dep).ok_or_else(|| RegistryError::UnknownDependency(dep.clone()))?;
                if !dep_worker.status.is_terminal_success() {
                    all_terminal_success = false;
                }
            }
            all_terminal_success
        };

        let breaker = self.breakers.get_or_create(&format!("spawn:{}", req.project), self.breaker_config);
        let mut breaker_events = Vec::new();
        let permit = breaker.acquire(&mut breaker_events)?;

        // Pending (dependency-gated) workers don't hold a concurrency slot
        // until they actually start running; only charge the cap here when
        // this spawn will run immediately.
        let admission = if deps_satisfied {
            Some(
                self.semaphore
                    .clone()
                    .try_acquire_owned()
                    .map_err(|_| RegistryError::CapacityExceeded(self.semaphore.available_permits()))?,
            )
        } else {
            None
        };

        let id = WorkerId::generate();
        let now = self.now_ms();
        let status = if deps_satisfied { WorkerStatus::Running } else { WorkerStatus::Pending };
        let worker = Worker {
            id: id.clone(),
            label: req.label,
            project: req.project.clone(),
            status,
            health: foreman_core::Health::Starting,
            auto_accept: req.auto_accept.unwrap_or(true),
            auto_accept_paused: false,
            depends_on: req.depends_on,
            parent_worker_id: req.parent_worker_id.clone(),
            parent_label,
            child_worker_ids: Vec::new(),
            ralph_mode: req.ralph_mode,
            ralph_token: if req.ralph_mode { Some(RalphToken::generate()) } else { None },
            task: req.task,
            created_at_ms: now,
            completed_at_ms: None,
            crashed_at_ms: None,
        };

        self.persist(Event::WorkerSpawned { worker: worker.clone() }).await?;
        if let Some(parent_id) = &worker.parent_worker_id {
            self.persist(Event::WorkerChildAdded { parent_id: parent_id.clone(), child_id: id.clone() }).await?;
        }
        self.rings.lock().insert(id.clone(), OutputRing::new(self.ring_buffer_bytes));

        let pending_command =
            PendingCommand { command: req.command, args: req.args, cwd: req.cwd, initial_input: req.initial_input };

        // `admission` is `Some` exactly when `deps_satisfied` -- match on it
        // directly instead of re-deriving that from `status`.
        match admission {
            Some(admission) => match self.start_session(&id, &pending_command, admission).await {
                Ok(()) => {
                    let mut events = Vec::new();
                    breaker.success(permit, std::time::Duration::ZERO, &mut events);
                }
                Err(e) => {
                    let mut events = Vec::new();
                    breaker.failure(permit, e.to_string(), &mut events);
                    self.persist(Event::WorkerCrashed { worker_id: id.clone(), at_ms: self.now_ms() }).await?;
                    return Err(e.into());
                }
            },
            None => {
                let mut events = Vec::new();
                breaker.success(permit, std::time::Duration::ZERO, &mut events);
                self.pending_commands.lock().insert(id.clone(), pending_command);
            }
        }

        Ok(worker.strip_secret())
    }

    /// Spawn the OS session for a worker that is becoming `running`,
    /// recording the admission permit it now holds.
    async fn start_session(
        &self,
        id: &WorkerId,
        cmd: &PendingCommand,
        admission: tokio::sync::OwnedSemaphorePermit,
    ) -> Result<(), crate::session::SessionError> {
        self.sessions
            .spawn(
                SessionConfig { worker_id: id.clone(), command: cmd.command.clone(), args: cmd.args.clone(), cwd: cmd.cwd.clone() },
                self.output_tx.clone(),
            )
            .await?;
        self.admissions.lock().insert(id.clone(), admission);
        if let Some(input) = &cmd.initial_input {
            let _ = self.sessions.send_input(id, input).await;
        }
        Ok(())
    }

    pub async fn patch_label(&self, id: &WorkerId, label: String) -> Result<Worker, RegistryError> {
        foreman_core::validate_label(&label)?;
        self.require(id)?;
        self.persist(Event::WorkerLabelChanged { worker_id: id.clone(), label }).await?;
        self.get(id).ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    pub async fn settings(
        &self,
        id: &WorkerId,
        auto_accept: Option<bool>,
        auto_accept_paused: Option<bool>,
    ) -> Result<Worker, RegistryError> {
        let current = self.require(id)?;
        self.persist(Event::WorkerSettingsChanged {
            worker_id: id.clone(),
            auto_accept: auto_accept.unwrap_or(current.auto_accept),
            auto_accept_paused: auto_accept_paused.unwrap_or(current.auto_accept_paused),
        })
        .await?;
        self.get(id).ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    pub async fn send_input(&self, id: &WorkerId, input: &[u8]) -> Result<(), RegistryError> {
        if input.is_empty() {
            return Err(RegistryError::EmptyInput);
        }
        if input.len() > foreman_core::MAX_INPUT_BYTES {
            return Err(RegistryError::InputTooLarge(input.len(), foreman_core::MAX_INPUT_BYTES));
        }
        let worker = self.require(id)?;
        if worker.status.is_terminal() {
            return Err(RegistryError::AlreadyTerminal(id.clone()));
        }
        self.sessions.send_input(id, input).await.map_err(RegistryError::from)
    }

    /// `running -> awaiting_review`. Idempotent if already `awaiting_review`.
    pub async fn complete(&self, id: &WorkerId) -> Result<Worker, RegistryError> {
        let worker = self.require(id)?;
        match worker.status {
            WorkerStatus::AwaitingReview => Ok(worker),
            WorkerStatus::Running => {
                let now = self.now_ms();
                self.persist(Event::WorkerStatusChanged {
                    worker_id: id.clone(),
                    from: WorkerStatus::Running,
                    to: WorkerStatus::AwaitingReview,
                    at_ms: now,
                })
                .await?;
                self.get(id).ok_or_else(|| RegistryError::NotFound(id.clone()))
            }
            s if s.is_terminal() => Err(RegistryError::AlreadyTerminal(id.clone())),
            _ => Err(RegistryError::IllegalTransition(id.clone())),
        }
    }

    /// The ralph-mode completion signal: validate the token, then run the
    /// same `awaiting_review -> completed` transition [`Registry::dismiss`]
    /// uses -- the two endpoints have overlapping semantics (`spec.md` §9),
    /// and `dismiss` is the canonical one.
    pub async fn ralph_signal(&self, id: &WorkerId, ralph_token: &str) -> Result<Worker, RegistryError> {
        let worker = self.require(id)?;
        if !worker.ralph_mode {
            return Err(RegistryError::NotRalphMode(id.clone()));
        }
        let expected = worker.ralph_token.as_ref().map(RalphToken::as_str).unwrap_or("");
        if expected != ralph_token {
            return Err(RegistryError::RalphTokenMismatch(id.clone()));
        }
        self.dismiss(id).await
    }

    /// The sole `awaiting_review -> completed` transition.
    pub async fn dismiss(&self, id: &WorkerId) -> Result<Worker, RegistryError> {
        let worker = self.require(id)?;
        if worker.status.is_terminal() {
            return Err(RegistryError::AlreadyTerminal(id.clone()));
        }
        if worker.status != WorkerStatus::AwaitingReview {
            return Err(RegistryError::IllegalTransition(id.clone()));
        }
        let now = self.now_ms();
        self.persist(Event::WorkerStatusChanged {
            worker_id: id.clone(),
            from: worker.status,
            to: WorkerStatus::Completed,
            at_ms: now,
        })
        .await?;
        self.checkpoint(id, Health::Dead, now).await?;
        let _ = self.sessions.kill(id, false).await;
        self.admissions.lock().remove(id);
        self.release_dependents(id, true).await?;
        self.get(id).ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    pub async fn kill(&self, id: &WorkerId, force: bool) -> Result<Worker, RegistryError> {
        let worker = self.require(id)?;
        if worker.status.is_terminal() {
            return Err(RegistryError::AlreadyTerminal(id.clone()));
        }
        let now = self.now_ms();
        self.persist(Event::WorkerKilled { worker_id: id.clone(), at_ms: now, forced: force }).await?;
        self.checkpoint(id, Health::Dead, now).await?;
        let _ = self.sessions.kill(id, force).await;
        self.admissions.lock().remove(id);
        self.pending_commands.lock().remove(id);
        self.release_dependents(id, false).await?;
        self.get(id).ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Record a crash observed by the health poller or the session's own
    /// exit, independent of any operator-initiated action.
    pub async fn mark_crashed(&self, id: &WorkerId) -> Result<(), RegistryError> {
        match self.get(id) {
            Some(w) if !w.status.is_terminal() => w,
            _ => return Ok(()),
        };
        let now = self.now_ms();
        self.persist(Event::WorkerCrashed { worker_id: id.clone(), at_ms: now }).await?;
        self.checkpoint(id, Health::Dead, now).await?;
        self.admissions.lock().remove(id);
        self.pending_commands.lock().remove(id);
        self.release_dependents(id, false).await?;
        Ok(())
    }

    async fn checkpoint(&self, id: &WorkerId, final_health: Health, died_at_ms: u64) -> Result<(), RegistryError> {
        let worker = self.require(id)?;
        let tail = self.rings.lock().get(id).map(|r| r.tail()).unwrap_or_default();
        let checkpoint = Checkpoint {
            label: worker.label.clone(),
            project: worker.project.clone(),
            worker_id: id.clone(),
            created_at_ms: worker.created_at_ms,
            died_at_ms,
            final_health,
            last_output_tail: tail,
            child_worker_ids: worker.child_worker_ids.clone(),
            parent_worker_id: worker.parent_worker_id.clone(),
        };
        self.checkpoints.write(&checkpoint)?;
        self.persist(Event::CheckpointCreated { checkpoint }).await
    }

    /// After `id` reaches a terminal state, start any pending dependent
    /// whose dependencies are now all satisfied; cascade failure to
    /// dependents of a non-success terminal.
    async fn release_dependents(&self, id: &WorkerId, succeeded: bool) -> Result<(), RegistryError> {
        let pending: Vec<Worker> = {
            let state = self.state.lock();
            state
                .workers()
                .filter(|w| w.status == WorkerStatus::Pending && w.depends_on.contains(id))
                .cloned()
                .collect()
        };
        for dependent in pending {
            if !succeeded {
                // `mark_crashed` calls back into `release_dependents`; box
                // this edge so the mutual recursion has a fixed-size future.
                Box::pin(self.mark_crashed(&dependent.id)).await?;
                continue;
            }
            let all_satisfied = {
                let state = self.state.lock();
                dependent.depends_on.iter().all(|d| state.worker(d).map(|w| w.status.is_terminal_success()).unwrap_or(false))
            };
            if !all_satisfied {
                continue;
            }
            // The dependency that just terminated freed its own permit
            // above, so a slot is normally available; if contention beats
            // us to it, leave the worker pending for the next release.
            let Ok(admission) = self.semaphore.clone().try_acquire_owned() else {
                continue;
            };
            let Some(cmd) = self.pending_commands.lock().remove(&dependent.id) else {
                continue;
            };
            self.persist(Event::WorkerStatusChanged {
                worker_id: dependent.id.clone(),
                from: WorkerStatus::Pending,
                to: WorkerStatus::Running,
                at_ms: self.now_ms(),
            })
            .await?;
            if self.start_session(&dependent.id, &cmd, admission).await.is_err() {
                Box::pin(self.mark_crashed(&dependent.id)).await?;
            }
        }
        Ok(())
    }

    fn require(&self, id: &WorkerId) -> Result<Worker, RegistryError> {
        self.get(id).ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Append fresh output bytes to a worker's ring and durable history.
    pub fn record_output(&self, output: SessionOutput) -> Result<u64, RegistryError> {
        let mut state = self.state.lock();
        let seq = state.next_output_seq(&output.worker_id);
        state.apply(&Event::WorkerOutput { worker_id: output.worker_id.clone(), seq, bytes: output.bytes.clone() });
        drop(state);
        self.rings.lock().entry(output.worker_id.clone()).or_insert_with(|| OutputRing::new(self.ring_buffer_bytes)).push(seq, output.bytes.clone());
        self.history.append(&output.worker_id, &output.bytes)?;
        self.fanout.publish(Event::WorkerOutput { worker_id: output.worker_id, seq, bytes: output.bytes });
        Ok(seq)
    }

    pub async fn next_output(&self) -> Option<SessionOutput> {
        self.output_rx.lock().await.recv().await
    }

    /// The live in-memory tail of a worker's captured output.
    pub fn tail(&self, id: &WorkerId) -> Result<Vec<u8>, RegistryError> {
        self.require(id)?;
        Ok(self.rings.lock().get(id).map(|r| r.tail()).unwrap_or_default())
    }

    /// Retained output chunks for `id` with `seq > since_seq`, oldest
    /// first, as individual `(seq, bytes)` pairs -- used to backfill a
    /// `Subscribe` reconnect without collapsing sequence boundaries.
    pub fn output_since(&self, id: &WorkerId, since_seq: u64) -> Result<Vec<(u64, Vec<u8>)>, RegistryError> {
        self.require(id)?;
        Ok(self
            .rings
            .lock()
            .get(id)
            .map(|r| r.chunks_since(since_seq).into_iter().map(|c| (c.seq, c.bytes)).collect())
            .unwrap_or_default())
    }

    /// A byte-range page of a worker's durable output history.
    pub fn history(&self, id: &WorkerId, offset: usize, limit: usize) -> Result<Vec<u8>, RegistryError> {
        self.require(id)?;
        let all = self.history.read_all(id)?;
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    pub fn list_checkpoints(&self) -> Vec<Checkpoint> {
        self.state.lock().checkpoints().to_vec()
    }

    /// Worker ids the health poller should be watching: anything currently
    /// counted against `concurrency_cap`.
    pub fn running_ids(&self) -> Vec<WorkerId> {
        self.state.lock().workers().filter(|w| w.status == WorkerStatus::Running).map(|w| w.id.clone()).collect()
    }

    pub async fn is_session_alive(&self, id: &WorkerId) -> bool {
        self.sessions.is_alive(id).await
    }

    pub fn subscribe(&self) -> crate::fanout::Subscription {
        self.fanout.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn sessions_handle(&self) -> &S {
        &self.sessions
    }

    /// Record an observed health transition. A no-op if it matches the
    /// worker's current health, so a steady-state poller doesn't spam the
    /// WAL with identical events every tick.
    pub async fn note_health(&self, id: &WorkerId, to: Health) -> Result<(), RegistryError> {
        let worker = self.require(id)?;
        if worker.health == to {
            return Ok(());
        }
        self.persist(Event::WorkerHealthChanged { worker_id: id.clone(), from: worker.health, to, at_ms: self.now_ms() }).await
    }

    /// Reap worker records that have sat in a terminal state longer than
    /// `retention`, per `spec.md` §4.4's periodic sweep. Returns the ids
    /// reaped.
    pub async fn reap_terminal(&self, retention: Duration) -> Result<Vec<WorkerId>, RegistryError> {
        let now = self.now_ms();
        let retention_ms = retention.as_millis() as u64;
        let stale: Vec<WorkerId> = {
            let state = self.state.lock();
            state
                .workers()
                .filter(|w| w.status.is_terminal())
                .filter(|w| w.terminal_at_ms().is_some_and(|t| now.saturating_sub(t) >= retention_ms))
                .map(|w| w.id.clone())
                .collect()
        };
        for id in &stale {
            self.persist(Event::WorkerReaped { worker_id: id.clone() }).await?;
            self.rings.lock().remove(id);
        }
        Ok(stale)
    }
}

/// `spec.md` §6: `projectPath` rejects `..` components and must resolve to
/// a directory that exists under the configured projects base.
fn validate_project_path(projects_base: &std::path::Path, project: &str) -> Result<(), RegistryError> {
    let path = std::path::Path::new(project);
    if path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(RegistryError::InvalidProjectPath(project.to_string()));
    }
    if !projects_base.join(path).is_dir() {
        return Err(RegistryError::InvalidProjectPath(project.to_string()));
    }
    Ok(())
}

/// The fan-out must never leak `ralphToken`; strip it from any event that
/// embeds a full worker record before it leaves the registry.
fn strip_for_fanout(event: Event) -> Event {
    match event {
        Event::WorkerSpawned { worker } => Event::WorkerSpawned { worker: worker.strip_secret() },
        Event::WorkerDiscovered { worker } => Event::WorkerDiscovered { worker: worker.strip_secret() },
        other => other,
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
