// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane request and response bodies.
//!
//! Wire format: HTTP/1.1 over the project Unix socket with JSON bodies;
//! session output streams as server-sent events.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use orbital_core::{Session, SessionStatus, WorkflowStep};

/// Body of `POST /sessions`.
///
/// Omitted fields take server defaults; nothing is implicit beyond that.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub spec_files: Vec<PathBuf>,
    #[serde(default)]
    pub context_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    /// Explicit step list; overrides `workflow_name` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<WorkflowStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checker_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_budget_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_timeout_secs: Option<u64>,
    #[serde(default)]
    pub worktree: bool,
    #[serde(default)]
    pub dangerously_skip_permissions: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_promise: Option<String>,
}

/// Body of `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub pid: u32,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub project_dir: PathBuf,
    pub sessions: BTreeMap<SessionStatus, usize>,
    pub total_cost: f64,
}

/// Body of `GET /sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<Session>,
    pub total: usize,
}

/// Body of `POST /sessions/{id}/merge`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResponse {
    pub status: String,
}

/// Body of `POST /shutdown`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownResponse {
    pub status: String,
}

/// Error body for every non-2xx JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_sessions: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), running_sessions: None, hint: None }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
