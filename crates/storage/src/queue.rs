// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-project queue of pending specification files.
//!
//! Every mutation takes the cross-process queue lock, reloads the disk
//! state under it, mutates, and atomically rewrites the file, so the
//! disk and in-memory representations agree at every lock release.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use orbital_core::Error;

use crate::lock::with_exclusive_lock;
use crate::paths::ProjectPaths;
use crate::store::{read_json, write_json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub path: PathBuf,
    pub queued_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct QueueFile {
    entries: Vec<QueueEntry>,
}

/// Ordered set of pending specification paths.
#[derive(Debug)]
pub struct SpecQueue {
    file: PathBuf,
    lock: PathBuf,
    entries: Vec<QueueEntry>,
}

impl SpecQueue {
    /// Open the project queue, loading any persisted entries.
    ///
    /// The queue file is created lazily on first add.
    pub fn open(paths: &ProjectPaths) -> Result<Self, Error> {
        let file = paths.queue_file();
        let entries = read_json::<QueueFile>(&file)?.unwrap_or_default().entries;
        Ok(Self { file, lock: paths.queue_lock(), entries })
    }

    /// Add a path to the queue. Idempotent: re-adding an existing path
    /// leaves the queue unchanged and reports `false`.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> Result<bool, Error> {
        let path = path.into();
        let lock = self.lock.clone();
        with_exclusive_lock(&lock, || {
            self.reload()?;
            if self.entries.iter().any(|e| e.path == path) {
                debug!(path = %path.display(), "queue add ignored duplicate");
                return Ok(false);
            }
            self.entries.push(QueueEntry { path, queued_at: Utc::now() });
            self.persist()?;
            Ok(true)
        })
    }

    /// Remove a path from the queue; `NotFound` when it is absent.
    pub fn remove(&mut self, path: &Path) -> Result<(), Error> {
        let lock = self.lock.clone();
        with_exclusive_lock(&lock, || {
            self.reload()?;
            let before = self.entries.len();
            self.entries.retain(|e| e.path != path);
            if self.entries.len() == before {
                return Err(Error::NotFound(format!("queue entry {}", path.display())));
            }
            self.persist()
        })
    }

    /// Drain the queue: returns all pending paths in order and leaves the
    /// queue empty on disk and in memory.
    pub fn pop_all(&mut self) -> Result<Vec<PathBuf>, Error> {
        let lock = self.lock.clone();
        with_exclusive_lock(&lock, || {
            self.reload()?;
            let drained: Vec<PathBuf> =
                self.entries.drain(..).map(|e| e.path).collect();
            self.persist()?;
            Ok(drained)
        })
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    fn reload(&mut self) -> Result<(), Error> {
        self.entries = read_json::<QueueFile>(&self.file)?.unwrap_or_default().entries;
        Ok(())
    }

    fn persist(&self) -> Result<(), Error> {
        write_json(&self.file, &QueueFile { entries: self.entries.clone() })?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
