// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders and helpers for other crates' tests.

use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::id::SessionId;
use crate::session::Session;
use crate::status::SessionStatus;
use crate::workflow::{Workflow, WorkflowStep};

/// Builder for [`Session`] records in tests.
pub struct SessionBuilder {
    session: Session,
}

impl SessionBuilder {
    pub fn new() -> Self {
        let workflow = Workflow::builtin("build").unwrap_or_else(|| Workflow::new("build", vec![]));
        Self {
            session: Session {
                id: SessionId::generate(),
                status: SessionStatus::Pending,
                working_dir: PathBuf::from("/tmp/project"),
                spec_files: vec![PathBuf::from("/tmp/project/spec.md")],
                context_files: Vec::new(),
                notes_file: None,
                started_at: Utc::now(),
                completed_at: None,
                iteration: 0,
                max_iterations: 10,
                total_cost_usd: 0.0,
                total_tokens_in: 0,
                total_tokens_out: 0,
                max_budget_usd: 10.0,
                workflow: workflow.name.clone(),
                steps: workflow.steps,
                gate_retries: HashMap::new(),
                worktree: None,
                model: "claude-sonnet-4-5".into(),
                checker_model: "claude-haiku-4-5".into(),
                error: None,
                pid: None,
                completion_promise: "ORBITAL_COMPLETE".into(),
                dangerously_skip_permissions: false,
                iteration_timeout_secs: None,
            },
        }
    }

    pub fn id(mut self, id: SessionId) -> Self {
        self.session.id = id;
        self
    }

    pub fn status(mut self, status: SessionStatus) -> Self {
        self.session.status = status;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session.working_dir = dir.into();
        self
    }

    pub fn spec_files(mut self, files: Vec<PathBuf>) -> Self {
        self.session.spec_files = files;
        self
    }

    pub fn steps(mut self, steps: Vec<WorkflowStep>) -> Self {
        self.session.steps = steps;
        self
    }

    pub fn max_iterations(mut self, max: u32) -> Self {
        self.session.max_iterations = max;
        self
    }

    pub fn max_budget(mut self, usd: f64) -> Self {
        self.session.max_budget_usd = usd;
        self
    }

    pub fn promise(mut self, promise: impl Into<String>) -> Self {
        self.session.completion_promise = promise.into();
        self
    }

    pub fn iteration_timeout_secs(mut self, secs: u64) -> Self {
        self.session.iteration_timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Session {
        self.session
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
