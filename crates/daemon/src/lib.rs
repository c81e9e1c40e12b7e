// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! foremand: the worker orchestrator daemon. Library crate so the
//! end-to-end scenario tests can drive a full instance in-process,
//! with [`main`] staying a thin wrapper around [`run`].

pub mod config;
pub mod correction;
pub mod error;
pub mod fanout;
pub mod health;
pub mod listener;
pub mod registry;
pub mod session;
pub mod startup;
pub mod sweep;
pub mod templates;

use std::sync::Arc;

use config::Config;
use foreman_storage::{CheckpointStore, OutputHistoryStore, PidLock};
use registry::Registry;
use session::ProcessSessionAdapter;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct Daemon {
    pub registry: Arc<Registry<ProcessSessionAdapter>>,
    _pid_lock: PidLock,
}

/// Bring up a fully rehydrated daemon: acquire the single-instance lock,
/// replay durable state, reconcile it against reality, then return a
/// registry ready for the listener to accept connections against
/// (`spec.md` §4.4).
pub async fn bootstrap(config: &Config) -> anyhow::Result<Daemon> {
    std::fs::create_dir_all(&config.state_dir)?;
    let pid_lock = PidLock::acquire(config.pid_path())?;

    let (state, wal) = startup::load_initial_state(&config.state_dir)?;
    let sessions = Arc::new(ProcessSessionAdapter::new());
    let fanout = Arc::new(fanout::Fanout::new());
    let history = OutputHistoryStore::new(config.state_dir.join("output"))?;
    let checkpoints = CheckpointStore::new(config.state_dir.join("checkpoints"))?;

    let registry = Arc::new(Registry::with_template_command(
        wal,
        state,
        sessions,
        fanout,
        config.concurrency_cap,
        config.ring_buffer_bytes,
        config.breaker_defaults(),
        history,
        checkpoints,
        config.projects_base.clone(),
        config.template_command_parts(),
    ));

    startup::reconcile(&registry).await;
    info!("rehydration complete, ready to accept connections");

    Ok(Daemon { registry, _pid_lock: pid_lock })
}

/// Run the daemon to completion: bind the listener and drive the
/// background health/sweep tasks until `shutdown` fires, then wait up to
/// `config.shutdown_deadline()` for in-flight connections to drain.
pub async fn run(config: Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    let daemon = bootstrap(&config).await?;
    let registry = daemon.registry.clone();

    let history = OutputHistoryStore::new(config.state_dir.join("output"))?;

    let health_task = tokio::spawn({
        let registry = registry.clone();
        let shutdown = shutdown.clone();
        let poller = health::HealthPoller::new(registry, config.unhealthy_threshold, config.healthy_threshold);
        let interval = config.health_poll_interval();
        async move { poller.run(interval, shutdown).await }
    });

    let sweep_task = tokio::spawn({
        let registry = registry.clone();
        let shutdown = shutdown.clone();
        let interval = config.sweep_interval();
        let retention = config.retention();
        async move { sweep::run(registry, history, interval, retention, shutdown).await }
    });

    let listener = listener::Listener::new(config.socket_path(), registry);
    let listener_result = listener.run(shutdown.clone()).await;

    shutdown.cancel();
    let _ = tokio::time::timeout(config.shutdown_deadline(), async {
        let _ = health_task.await;
        let _ = sweep_task.await;
    })
    .await;

    listener_result.map_err(anyhow::Error::from)
}
