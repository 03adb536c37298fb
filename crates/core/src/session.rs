// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session record: the unit of supervision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::id::SessionId;
use crate::status::SessionStatus;
use crate::workflow::WorkflowStep;
use crate::worktree::WorktreeDescriptor;

/// Maximum retained output events per session.
pub const HISTORY_CAP: usize = 10_000;

/// A supervised session: a set of specification files driven through a
/// workflow until a terminal status.
///
/// Persisted records and in-memory records agree after every terminal
/// transition; runtime-only state (history, subscribers, completion
/// notifier) lives in the registry, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub status: SessionStatus,
    pub working_dir: PathBuf,
    pub spec_files: Vec<PathBuf>,
    #[serde(default)]
    pub context_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_file: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub iteration: u32,
    pub max_iterations: u32,
    pub total_cost_usd: f64,
    pub total_tokens_in: u64,
    pub total_tokens_out: u64,
    pub max_budget_usd: f64,
    /// Name of the selected workflow; `steps` is the resolved list.
    pub workflow: String,
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub gate_retries: HashMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree: Option<WorktreeDescriptor>,
    pub model: String,
    pub checker_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Pid of the daemon that last drove this session; used by discovery
    /// to tell stale records from live ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub completion_promise: String,
    #[serde(default)]
    pub dangerously_skip_permissions: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_timeout_secs: Option<u64>,
}

impl Session {
    /// Where the agent runs: the worktree checkout when isolated,
    /// otherwise the project directory.
    pub fn effective_working_dir(&self) -> &Path {
        match &self.worktree {
            Some(wt) => &wt.path,
            None => &self.working_dir,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn gate_retry_count(&self, step: &str) -> u32 {
        self.gate_retries.get(step).copied().unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
