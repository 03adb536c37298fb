// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration and per-session defaults.

use std::path::PathBuf;
use std::time::Duration;

use orbital_core::{Error, Workflow};
use orbital_storage::ProjectPaths;

/// Cap on buffered agent output per step.
pub const DEFAULT_MAX_OUTPUT_SIZE: usize = 10 * 1024 * 1024;

/// Bound on graceful shutdown.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Server defaults applied to omitted `StartSessionRequest` fields.
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub max_iterations: u32,
    pub max_budget_usd: f64,
    pub model: String,
    pub checker_model: String,
    pub workflow: String,
    pub completion_promise: String,
    pub iteration_timeout_secs: Option<u64>,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            max_budget_usd: 10.0,
            model: "claude-sonnet-4-5".into(),
            checker_model: "claude-haiku-4-5".into(),
            workflow: "build".into(),
            completion_promise: "ORBITAL_COMPLETE".into(),
            iteration_timeout_secs: None,
        }
    }
}

/// Full daemon configuration for one project.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub project_dir: PathBuf,
    pub paths: ProjectPaths,
    /// Concurrent-session cap.
    pub max_concurrent_sessions: usize,
    /// Agent command the executor spawns.
    pub agent_command: String,
    pub max_output_size: usize,
    pub defaults: SessionDefaults,
}

impl DaemonConfig {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let paths = ProjectPaths::new(&project_dir);
        Self {
            project_dir,
            paths,
            max_concurrent_sessions: 3,
            agent_command: "claude".into(),
            max_output_size: DEFAULT_MAX_OUTPUT_SIZE,
            defaults: SessionDefaults::default(),
        }
    }

    /// Resolve the workflow a request names.
    pub fn resolve_workflow(&self, name: &str) -> Result<Workflow, Error> {
        Workflow::builtin(name)
            .ok_or_else(|| Error::Invalid(format!("unknown workflow: {:?}", name)))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
