// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log: one newline-delimited JSON [`Event`] per line, fsynced
//! on every append. Replay feeds a [`crate::MaterializedState`] at startup.

use foreman_core::Event;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::StorageError;

pub struct Wal {
    path: PathBuf,
    file: File,
}

impl Wal {
    /// Open (creating if absent) the log at `path` for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;
        Ok(Self { path, file })
    }

    /// Append one event and fsync before returning. An error here means the
    /// event is NOT durable and the caller must not acknowledge it.
    pub fn append(&mut self, event: &Event) -> Result<(), StorageError> {
        let mut line = serde_json::to_vec(event).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        line.push(b'\n');
        self.file.write_all(&line).map_err(|e| StorageError::io(&self.path, e))?;
        self.file.sync_all().map_err(|e| StorageError::io(&self.path, e))?;
        Ok(())
    }

    /// Replay every well-formed record in order. A trailing partial line
    /// (a torn write from a crash mid-append) is skipped rather than erred.
    pub fn replay(path: impl AsRef<Path>) -> Result<Vec<Event>, StorageError> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(path, e)),
        };
        let reader = BufReader::new(file);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| StorageError::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(&line) {
                Ok(ev) => events.push(ev),
                Err(_) => break, // torn tail record; stop replay here
            }
        }
        Ok(events)
    }

    /// Truncate the log to empty, used right after a snapshot is durable.
    pub fn truncate(&mut self) -> Result<(), StorageError> {
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))?;
        self.file.sync_all().map_err(|e| StorageError::io(&self.path, e))?;
        self.file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
