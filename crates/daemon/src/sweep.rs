// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic maintenance (`spec.md` §4.4's retention rules): re-verify
//! `running` sessions, reap worker records that have sat in a terminal
//! state past `retention`, and prune durable output past the same window.

use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::registry::Registry;
use crate::session::SessionAdapter;
use foreman_storage::OutputHistoryStore;

pub async fn sweep_once<S: SessionAdapter>(registry: &Registry<S>, history: &OutputHistoryStore, retention: Duration) {
    for id in registry.running_ids() {
        if !registry.is_session_alive(&id).await {
            warn!(worker_id = %id, "sweep found a dead session still marked running");
            let _ = registry.mark_crashed(&id).await;
        }
    }

    match registry.reap_terminal(retention).await {
        Ok(reaped) if !reaped.is_empty() => info!(count = reaped.len(), "reaped worker records past retention"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "terminal worker reap failed"),
    }

    match history.prune(SystemTime::now(), retention) {
        Ok(pruned) if !pruned.is_empty() => info!(count = pruned.len(), "pruned output history past retention"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "output history prune failed"),
    }
}

pub async fn run<S: SessionAdapter>(
    registry: std::sync::Arc<Registry<S>>,
    history: OutputHistoryStore,
    interval: Duration,
    retention: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => sweep_once(&registry, &history, retention).await,
            _ = shutdown.cancelled() => {
                info!("sweep task shutting down");
                break;
            }
        }
    }
}
