// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session registry: the in-memory session map and its durable mirror.
//!
//! Every mutation persists the full envelope to
//! `<project>/.orbital/daemon-state.json` before returning, so the
//! persisted record and the in-memory record agree after every
//! transition. Runtime-only state (history, subscribers, completion
//! notifier) is rebuilt on load.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use orbital_core::{
    Error, OutputEvent, Result, RingBuffer, Session, SessionId, SessionStatus, HISTORY_CAP,
};
use orbital_storage::{clean_orphan_tmp, read_json, write_json};

/// Bounded fan-out channel size per subscriber.
pub const SUBSCRIBER_CAPACITY: usize = 100;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateEnvelope {
    sessions: HashMap<SessionId, Session>,
}

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<OutputEvent>,
}

struct SessionEntry {
    record: Session,
    history: RingBuffer,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
    done: CancellationToken,
}

impl SessionEntry {
    fn new(record: Session) -> Self {
        let done = CancellationToken::new();
        if record.status.is_terminal() {
            done.cancel();
        }
        Self {
            record,
            history: RingBuffer::new(HISTORY_CAP),
            subscribers: Vec::new(),
            next_subscriber: 0,
            done,
        }
    }
}

/// A live handle onto one session's output stream.
pub struct Subscription {
    pub subscriber_id: u64,
    /// Live events; bounded, slow consumers drop.
    pub rx: mpsc::Receiver<OutputEvent>,
    /// History present at subscribe time; precedes anything on `rx`.
    pub history: Vec<OutputEvent>,
    /// Fires once when the session reaches a terminal status.
    pub done: CancellationToken,
}

/// Map of session-id → session record, persisted on every mutation.
pub struct SessionRegistry {
    state_path: PathBuf,
    inner: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl SessionRegistry {
    /// Load the registry from disk.
    ///
    /// Records persisted as `running`/`merging` belong to a dead daemon
    /// and are rewritten to `interrupted`.
    pub fn load(state_path: PathBuf) -> Result<Self> {
        clean_orphan_tmp(&state_path);
        let envelope = read_json::<StateEnvelope>(&state_path)?.unwrap_or_default();

        let mut interrupted = 0usize;
        let mut entries = HashMap::with_capacity(envelope.sessions.len());
        for (id, mut record) in envelope.sessions {
            if matches!(record.status, SessionStatus::Running | SessionStatus::Merging) {
                record.status = SessionStatus::Interrupted;
                record.error = Some("daemon exited while the session was active".into());
                if record.completed_at.is_none() {
                    record.completed_at = Some(chrono::Utc::now());
                }
                interrupted += 1;
            }
            entries.insert(id, SessionEntry::new(record));
        }

        let registry = Self { state_path, inner: RwLock::new(entries) };
        if interrupted > 0 {
            info!(count = interrupted, "marked orphaned sessions interrupted");
            let inner = registry.inner.write();
            registry.persist(&inner)?;
        }
        Ok(registry)
    }

    /// Add a new record; `Conflict` on a duplicate id.
    pub fn add(&self, record: Session) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.contains_key(record.id.as_str()) {
            return Err(Error::Conflict(format!("session {} already exists", record.id)));
        }
        debug!(session_id = %record.id, "registering session");
        inner.insert(record.id.clone(), SessionEntry::new(record));
        self.persist(&inner)
    }

    /// Independent copy of a record; caller mutation cannot race the
    /// registry.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.inner.read().get(id).map(|e| e.record.clone())
    }

    pub fn list(&self) -> Vec<Session> {
        let inner = self.inner.read();
        let mut sessions: Vec<Session> = inner.values().map(|e| e.record.clone()).collect();
        sessions.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)));
        sessions
    }

    pub fn list_by_status(&self, status: SessionStatus) -> Vec<Session> {
        self.list().into_iter().filter(|s| s.status == status).collect()
    }

    pub fn count_by_status(&self) -> BTreeMap<SessionStatus, usize> {
        let inner = self.inner.read();
        let mut counts = BTreeMap::new();
        for entry in inner.values() {
            *counts.entry(entry.record.status).or_insert(0) += 1;
        }
        counts
    }

    pub fn total_cost(&self) -> f64 {
        self.inner.read().values().map(|e| e.record.total_cost_usd).sum()
    }

    /// Transition a session's status.
    ///
    /// A terminal transition stamps `completed_at` and fires the
    /// completion notifier exactly once; a transition back to a live
    /// status (resume) clears the terminal fields.
    pub fn update_status(
        &self,
        id: &str,
        status: SessionStatus,
        error: Option<String>,
    ) -> Result<Session> {
        let mut inner = self.inner.write();
        let entry = inner
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;

        entry.record.status = status;
        if status.is_terminal() {
            entry.record.completed_at = Some(chrono::Utc::now());
            if error.is_some() {
                entry.record.error = error;
            }
            // Idempotent: cancelling twice is a no-op.
            entry.done.cancel();
        } else {
            entry.record.completed_at = None;
            entry.record.error = error;
        }
        let record = entry.record.clone();
        self.persist(&inner)?;
        Ok(record)
    }

    /// Checkpoint iteration and accumulated usage.
    pub fn update_progress(
        &self,
        id: &str,
        iteration: u32,
        total_cost_usd: f64,
        total_tokens_in: u64,
        total_tokens_out: u64,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let entry = inner
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        entry.record.iteration = iteration;
        entry.record.total_cost_usd = total_cost_usd;
        entry.record.total_tokens_in = total_tokens_in;
        entry.record.total_tokens_out = total_tokens_out;
        self.persist(&inner)
    }

    /// Increment a step's gate retry counter; returns the new count.
    pub fn record_gate_retry(&self, id: &str, step: &str) -> Result<u32> {
        let mut inner = self.inner.write();
        let entry = inner
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        let count = entry.record.gate_retries.entry(step.to_string()).or_insert(0);
        *count += 1;
        let count = *count;
        self.persist(&inner)?;
        Ok(count)
    }

    /// Drop the worktree descriptor after a verified merge and cleanup.
    pub fn clear_worktree(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let entry = inner
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        entry.record.worktree = None;
        self.persist(&inner)
    }

    /// Record which daemon process is driving the session.
    pub fn set_pid(&self, id: &str, pid: u32) -> Result<()> {
        let mut inner = self.inner.write();
        let entry = inner
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        entry.record.pid = Some(pid);
        self.persist(&inner)
    }

    /// Snapshot history and register a live subscriber atomically: the
    /// returned history precedes every event the subscriber will see,
    /// with no duplicates and no gaps.
    pub fn subscribe(&self, id: &str) -> Result<Subscription> {
        let mut inner = self.inner.write();
        let entry = inner
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let subscriber_id = entry.next_subscriber;
        entry.next_subscriber += 1;
        entry.subscribers.push(Subscriber { id: subscriber_id, tx });
        Ok(Subscription {
            subscriber_id,
            rx,
            history: entry.history.snapshot(),
            done: entry.done.clone(),
        })
    }

    pub fn unsubscribe(&self, id: &str, subscriber_id: u64) {
        if let Some(entry) = self.inner.write().get_mut(id) {
            entry.subscribers.retain(|s| s.id != subscriber_id);
        }
    }

    /// Append to history and fan out to live subscribers.
    ///
    /// Never blocks on a slow subscriber: a full channel drops the
    /// event for that subscriber only.
    pub fn broadcast(&self, id: &str, event: OutputEvent) -> Result<()> {
        let mut inner = self.inner.write();
        let entry = inner
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        entry.history.write(event.clone());
        entry.subscribers.retain(|sub| match sub.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(session_id = %id, subscriber = sub.id, "subscriber full, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        Ok(())
    }

    fn persist(&self, inner: &HashMap<SessionId, SessionEntry>) -> Result<()> {
        let envelope = StateEnvelope {
            sessions: inner
                .iter()
                .map(|(id, entry)| (id.clone(), entry.record.clone()))
                .collect(),
        };
        write_json(&self.state_path, &envelope).map_err(|e| {
            warn!(error = %e, "state file write failed");
            Error::from(e)
        })
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
