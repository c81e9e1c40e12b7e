// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-instance enforcement: an advisory exclusive lock on a PID file in
//! `state_dir`, held for the process lifetime (`spec.md` §1, single-process).

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

pub struct PidLock {
    path: PathBuf,
    file: File,
}

impl PidLock {
    /// Acquire the lock or fail immediately if another process holds it.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let mut file =
            OpenOptions::new().create(true).read(true).write(true).open(&path).map_err(|e| StorageError::io(&path, e))?;
        file.try_lock_exclusive().map_err(|_| StorageError::AlreadyLocked { path: path.clone() })?;
        file.set_len(0).map_err(|e| StorageError::io(&path, e))?;
        write!(file, "{}", std::process::id()).map_err(|e| StorageError::io(&path, e))?;
        file.sync_all().map_err(|e| StorageError::io(&path, e))?;
        Ok(Self { path, file })
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
