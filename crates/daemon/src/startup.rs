// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restart-time discovery and rehydration (`spec.md` §4.4). Only after this
//! completes does the daemon accept connections on its listener.

use foreman_storage::{load_snapshot, MaterializedState, StorageError, Wal};
use std::path::Path;
use tracing::{info, warn};

use crate::registry::Registry;
use crate::session::SessionAdapter;

/// Step 1: load the most recent snapshot (if any) and replay whatever WAL
/// tail sits on top of it, producing the projection the registry starts
/// from and the open `Wal` handle it appends to from here on.
pub fn load_initial_state(state_dir: &Path) -> Result<(MaterializedState, Wal), StorageError> {
    let snapshot_path = state_dir.join("snapshot.bin");
    let wal_path = state_dir.join("wal.jsonl");

    let mut state = match load_snapshot(&snapshot_path)? {
        Some(snapshot) => {
            info!(wal_offset = snapshot.wal_offset, "loaded snapshot");
            snapshot.into_state()
        }
        None => {
            info!("no snapshot found, starting from an empty projection");
            MaterializedState::new()
        }
    };

    let events = Wal::replay(&wal_path)?;
    info!(replayed = events.len(), "replayed WAL tail");
    state.apply_all(&events);

    let wal = Wal::open(&wal_path)?;
    Ok((state, wal))
}

/// Steps 2 and 4: for every worker the snapshot+WAL claims is still
/// `running`, check whether its session actually survived the restart.
/// This process's [`SessionAdapter`] starts with no sessions attached, so
/// in practice every one of them is found gone and crash-handled -- there
/// is no OS-level session registry in this implementation to re-attach
/// to (step 3's host scan for orphaned sessions has no counterpart here
/// for the same reason; nothing to discover beyond what the WAL already
/// names).
pub async fn reconcile<S: SessionAdapter>(registry: &Registry<S>) {
    for id in registry.running_ids() {
        if !registry.is_session_alive(&id).await {
            warn!(worker_id = %id, "session not found at startup, marking crashed");
            let _ = registry.mark_crashed(&id).await;
        } else {
            info!(worker_id = %id, "session re-attached at startup");
        }
    }
}
