// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios seeded from the registry's testable properties:
//! CRUD happy path, duplicate detection, dependency gating, output
//! streaming with backfill, circuit breaker half-open, and correction
//! loop stagnation.

use async_trait::async_trait;
use foreman_core::correction::{Critique, Reflection, Severity, StopReason, TaskType, Verification};
use foreman_core::{BreakerConfig, FakeClock};
use foreman_daemon::correction::{self, Producer, ProducerError, ReflectionStore, Verifier};
use foreman_daemon::fanout::Fanout;
use foreman_daemon::registry::{Registry, SpawnRequest};
use foreman_daemon::session::{SessionAdapter, SessionConfig, SessionError, SessionOutput};
use foreman_storage::{CheckpointStore, MaterializedState, OutputHistoryStore, Wal};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Same shape as the daemon's own test double: no real subprocesses.
#[derive(Default)]
struct FakeSessions {
    alive: StdMutex<HashSet<foreman_core::WorkerId>>,
}

#[async_trait]
impl SessionAdapter for FakeSessions {
    async fn spawn(&self, config: SessionConfig, _output_tx: mpsc::UnboundedSender<SessionOutput>) -> Result<(), SessionError> {
        self.alive.lock().unwrap().insert(config.worker_id);
        Ok(())
    }

    async fn send_input(&self, worker_id: &foreman_core::WorkerId, _input: &[u8]) -> Result<(), SessionError> {
        if self.alive.lock().unwrap().contains(worker_id) {
            Ok(())
        } else {
            Err(SessionError::NotFound(worker_id.clone()))
        }
    }

    async fn kill(&self, worker_id: &foreman_core::WorkerId, _force: bool) -> Result<(), SessionError> {
        self.alive.lock().unwrap().remove(worker_id);
        Ok(())
    }

    async fn is_alive(&self, worker_id: &foreman_core::WorkerId) -> bool {
        self.alive.lock().unwrap().contains(worker_id)
    }
}

fn make_registry(dir: &TempDir, cap: usize) -> Registry<FakeSessions> {
    let wal = Wal::open(dir.path().join("wal.jsonl")).expect("open wal");
    let history = OutputHistoryStore::new(dir.path().join("history")).expect("open history");
    let checkpoints = CheckpointStore::new(dir.path().join("checkpoints")).expect("open checkpoints");
    std::fs::create_dir_all(dir.path().join("strategos")).expect("create project dir");
    Registry::new(
        wal,
        MaterializedState::new(),
        Arc::new(FakeSessions::default()),
        Arc::new(Fanout::new()),
        cap,
        1024 * 1024,
        BreakerConfig::default(),
        history,
        checkpoints,
        dir.path().to_path_buf(),
    )
}

fn spawn_req(label: &str, project: &str) -> SpawnRequest {
    SpawnRequest {
        label: label.to_string(),
        project: project.to_string(),
        command: "true".to_string(),
        args: Vec::new(),
        cwd: None,
        depends_on: Vec::new(),
        parent_worker_id: None,
        ralph_mode: false,
        initial_input: None,
        allow_duplicate: false,
        auto_accept: None,
        task: None,
    }
}

#[tokio::test]
async fn crud_happy_path() {
    let dir = TempDir::new().expect("tempdir");
    let registry = make_registry(&dir, 4);

    let worker = registry.spawn(spawn_req("TEST: a", "strategos")).await.expect("spawn");
    assert_eq!(worker.status, foreman_core::WorkerStatus::Running);
    assert!(worker.auto_accept);
    assert!(worker.depends_on.is_empty());
    assert!(worker.ralph_token.is_none());

    let fetched = registry.get(&worker.id).expect("get");
    assert_eq!(fetched.label, worker.label);
    assert_eq!(fetched.id, worker.id);

    let patched = registry.patch_label(&worker.id, "TEST: a2".to_string()).await.expect("patch");
    assert_eq!(patched.label, "TEST: a2");
    assert_eq!(registry.get(&worker.id).expect("get after patch").label, "TEST: a2");

    // "delete" on the operational surface is the `kill` core op (spec.md
    // §6's DELETE /workers/:id row). After it, the worker record still
    // exists in a terminal state -- it isn't gone until a sweep reaps it.
    registry.kill(&worker.id, true).await.expect("kill");
    let killed = registry.get(&worker.id).expect("get after kill");
    assert_eq!(killed.status, foreman_core::WorkerStatus::Killed);

    let reaped = registry.reap_terminal(std::time::Duration::from_secs(0)).await.expect("reap");
    assert_eq!(reaped, vec![worker.id.clone()]);
    assert!(registry.get(&worker.id).is_none());
}

#[tokio::test]
async fn spawn_from_template_fills_in_task_metadata() {
    let dir = TempDir::new().expect("tempdir");
    let registry = make_registry(&dir, 4);

    let worker = registry
        .spawn_from_template("fix", "TEST: fix-it".to_string(), "strategos".to_string(), "patch the off-by-one".to_string())
        .await
        .expect("spawn from template");
    let task = worker.task.expect("template spawn sets task metadata");
    assert_eq!(task.task_type, "fix");
    assert_eq!(task.description, "patch the off-by-one");

    let err = registry
        .spawn_from_template("not-a-template", "TEST: bogus".to_string(), "strategos".to_string(), "x".to_string())
        .await
        .expect_err("unknown template is rejected");
    assert!(matches!(err, foreman_daemon::error::RegistryError::UnknownTemplate(_)));
}

#[tokio::test]
async fn duplicate_spawn_is_blocked_unless_allowed() {
    let dir = TempDir::new().expect("tempdir");
    let registry = make_registry(&dir, 4);

    registry.spawn(spawn_req("TEST: dup", "strategos")).await.expect("first spawn succeeds");
    let err = registry.spawn(spawn_req("TEST: dup", "strategos")).await.expect_err("second spawn is rejected");
    assert!(matches!(err, foreman_daemon::error::RegistryError::Duplicate));
}

#[tokio::test]
async fn dependency_gating_releases_on_completion() {
    let dir = TempDir::new().expect("tempdir");
    let registry = make_registry(&dir, 4);

    let a = registry.spawn(spawn_req("A", "strategos")).await.expect("spawn a");
    let mut b_req = spawn_req("B", "strategos");
    b_req.depends_on = vec![a.id.clone()];
    let b = registry.spawn(b_req).await.expect("spawn b");
    assert_eq!(b.status, foreman_core::WorkerStatus::Pending);

    registry.complete(&a.id).await.expect("complete a");
    registry.dismiss(&a.id).await.expect("dismiss a");

    let released = registry.get(&b.id).expect("get b");
    assert_eq!(released.status, foreman_core::WorkerStatus::Running);
}

#[tokio::test]
async fn output_streaming_backfill_resumes_without_gaps() {
    let dir = TempDir::new().expect("tempdir");
    let registry = make_registry(&dir, 4);
    let worker = registry.spawn(spawn_req("W", "strategos")).await.expect("spawn");

    for chunk in [b"one\n".to_vec(), b"two\n".to_vec(), b"three\n".to_vec()] {
        registry.record_output(SessionOutput { worker_id: worker.id.clone(), bytes: chunk }).expect("record output");
    }

    // "Disconnect" after seeing seq 0; "reconnect" asking for everything
    // with seq > 0 -- must get exactly seq 1 and seq 2, none dropped or
    // repeated.
    let resumed = registry.output_since(&worker.id, 0).expect("output since");
    let seqs: Vec<u64> = resumed.iter().map(|(seq, _)| *seq).collect();
    assert_eq!(seqs, vec![1, 2]);
    assert_eq!(resumed[0].1, b"two\n");
    assert_eq!(resumed[1].1, b"three\n");
}

#[tokio::test]
async fn circuit_breaker_half_open_admits_exactly_one_probe() {
    let clock = FakeClock::new();
    let config = BreakerConfig {
        failure_threshold: 2,
        success_threshold: 2,
        open_timeout: std::time::Duration::from_millis(100),
        slow_call_duration_threshold: None,
        volume_threshold: None,
    };
    let breaker = foreman_core::CircuitBreaker::new("test", config, clock.clone());

    let mut events = Vec::new();
    let p1 = breaker.acquire(&mut events).expect("first call admitted");
    breaker.failure(p1, "boom", &mut events);
    let p2 = breaker.acquire(&mut events).expect("second call admitted");
    breaker.failure(p2, "boom", &mut events);
    assert_eq!(breaker.state(), foreman_core::BreakerState::Open);

    clock.advance(std::time::Duration::from_millis(150));

    let probe = breaker.acquire(&mut events).expect("probe admitted after timeout");
    let rejected = breaker.acquire(&mut events);
    assert!(rejected.is_err(), "a second concurrent call must be rejected while the probe is in flight");

    breaker.success(probe, std::time::Duration::ZERO, &mut events);
    assert_eq!(breaker.state(), foreman_core::BreakerState::HalfOpen);

    let p3 = breaker.acquire(&mut events).expect("second half-open success admitted");
    breaker.success(p3, std::time::Duration::ZERO, &mut events);
    assert_eq!(breaker.state(), foreman_core::BreakerState::Closed);
}

struct FixedCritiqueVerifier;

#[async_trait]
impl Verifier for FixedCritiqueVerifier {
    async fn verify(&self, _output: &str, _task_type: TaskType, _context: &str) -> Verification {
        let critiques = vec![
            Critique { kind: "lint".into(), severity: Severity::Error, location: None, message: "missing semicolon".into(), evidence: None, suggestion: None },
            Critique { kind: "style".into(), severity: Severity::Error, location: None, message: "bad indent".into(), evidence: None, suggestion: None },
        ];
        Verification::from_critiques(critiques, 0.3, None)
    }
}

struct EchoProducer(AtomicUsize);

#[async_trait]
impl Producer for EchoProducer {
    async fn send_critique(&self, _formatted: &str, _context: &str) -> Result<String, ProducerError> {
        let n = self.0.fetch_add(1, Ordering::SeqCst);
        Ok(format!("revision-{n}"))
    }
}

struct NoopReflections;

#[async_trait]
impl ReflectionStore for NoopReflections {
    async fn retrieve(&self, _task_type: TaskType, _project_id: &str, _limit: usize) -> Vec<Reflection> {
        Vec::new()
    }
    async fn store(&self, _reflection: Reflection) {}
    async fn reinforce(&self, _reflection: &Reflection, _boost: f64) {}
}

#[tokio::test]
async fn correction_loop_halts_on_stagnant_critiques() {
    let producer = EchoProducer(AtomicUsize::new(0));
    let result = correction::run(
        &producer,
        &FixedCritiqueVerifier,
        Some(&NoopReflections),
        TaskType::Code,
        "initial".to_string(),
        "strategos",
        "",
    )
    .await;

    assert_eq!(result.stop_reason, StopReason::NoNewCritiques);
    assert_eq!(result.iterations, 2);
    assert!(!result.success);
}
