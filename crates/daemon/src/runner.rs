// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session runner: bounded-concurrency supervisor for session tasks.
//!
//! The runner owns the map of live cancellation tokens, translates
//! engine results into terminal statuses, and drives the merge phase
//! for isolated sessions. It is the only component that performs
//! terminal transitions.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use orbital_core::{
    Error, LimitKind, Result, Session, SessionId, SessionStatus, Workflow,
};

use crate::config::DaemonConfig;
use crate::engine::{EngineError, RunOptions, WorkflowEngine};
use crate::executor::AgentExecutor;
use crate::protocol::StartSessionRequest;
use crate::registry::SessionRegistry;
use crate::worktree::WorktreeManager;

pub struct SessionRunner {
    config: Arc<DaemonConfig>,
    registry: Arc<SessionRegistry>,
    executor: Arc<dyn AgentExecutor>,
    worktrees: Arc<WorktreeManager>,
    active: Mutex<HashMap<SessionId, CancellationToken>>,
}

impl SessionRunner {
    pub fn new(
        config: Arc<DaemonConfig>,
        registry: Arc<SessionRegistry>,
        executor: Arc<dyn AgentExecutor>,
        worktrees: Arc<WorktreeManager>,
    ) -> Self {
        Self { config, registry, executor, worktrees, active: Mutex::new(HashMap::new()) }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Validate a start request, create the session, and spawn its task.
    pub async fn start(self: &Arc<Self>, req: StartSessionRequest) -> Result<Session> {
        if req.spec_files.is_empty() {
            return Err(Error::Invalid("at least one specification file is required".into()));
        }
        let workflow = self.resolve_workflow(&req)?;
        workflow.validate()?;

        let id = SessionId::generate();
        let token = self.reserve_slot(&id)?;

        let defaults = &self.config.defaults;
        let project_dir = self.config.project_dir.clone();
        let spec_files: Vec<PathBuf> =
            req.spec_files.iter().map(|p| absolutize(&project_dir, p)).collect();
        let context_files: Vec<PathBuf> =
            req.context_files.iter().map(|p| absolutize(&project_dir, p)).collect();

        let mut session = Session {
            id: id.clone(),
            status: SessionStatus::Pending,
            working_dir: project_dir,
            spec_files: spec_files.clone(),
            context_files,
            notes_file: req.notes_file,
            started_at: chrono::Utc::now(),
            completed_at: None,
            iteration: 0,
            max_iterations: req.max_iterations.unwrap_or(defaults.max_iterations),
            total_cost_usd: 0.0,
            total_tokens_in: 0,
            total_tokens_out: 0,
            max_budget_usd: req.max_budget_usd.unwrap_or(defaults.max_budget_usd),
            workflow: workflow.name.clone(),
            steps: workflow.steps,
            gate_retries: HashMap::new(),
            worktree: None,
            model: req.model.unwrap_or_else(|| defaults.model.clone()),
            checker_model: req.checker_model.unwrap_or_else(|| defaults.checker_model.clone()),
            error: None,
            pid: Some(std::process::id()),
            completion_promise: req
                .completion_promise
                .unwrap_or_else(|| defaults.completion_promise.clone()),
            dangerously_skip_permissions: req.dangerously_skip_permissions,
            iteration_timeout_secs: req.iteration_timeout_secs.or(defaults.iteration_timeout_secs),
        };

        if req.worktree {
            match self.worktrees.create(spec_files, id.clone()).await {
                Ok(descriptor) => session.worktree = Some(descriptor),
                Err(e) => {
                    self.release_slot(&id);
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.registry.add(session) {
            self.release_slot(&id);
            return Err(e);
        }
        let record = self.registry.update_status(id.as_str(), SessionStatus::Running, None)?;
        info!(session_id = %id, "session started");

        self.spawn_driver(id, token, false);
        Ok(record)
    }

    /// Cancel a session's task; the task observes it and transitions.
    pub fn stop(&self, id: &str) -> Result<Session> {
        let session = self
            .registry
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        let token = self.active.lock().get(session.id.as_str()).cloned();
        match token {
            Some(token) => {
                info!(session_id = %id, "stop requested");
                token.cancel();
                Ok(session)
            }
            None if !session.status.is_terminal() => {
                // Live status with no task: the record predates this
                // process. Settle it directly.
                self.registry.update_status(id, SessionStatus::Stopped, None)
            }
            None => Err(Error::Invalid(format!(
                "session {} is {} and cannot be stopped",
                id, session.status
            ))),
        }
    }

    /// Re-enter an interrupted or stopped session at its checkpoint.
    pub async fn resume(self: &Arc<Self>, id: &str) -> Result<Session> {
        let session = self
            .registry
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        if !session.status.is_resumable() {
            return Err(Error::Invalid(format!(
                "session {} is {} and cannot be resumed",
                id, session.status
            )));
        }
        if let Some(worktree) = &session.worktree {
            if !worktree.path.exists() {
                return Err(Error::Invalid(format!(
                    "worktree {} is missing; cannot resume",
                    worktree.path.display()
                )));
            }
        }

        let token = self.reserve_slot(&session.id)?;
        self.registry.set_pid(id, std::process::id())?;
        let record = match self.registry.update_status(id, SessionStatus::Running, None) {
            Ok(record) => record,
            Err(e) => {
                self.release_slot(&session.id);
                return Err(e);
            }
        };
        info!(session_id = %id, iteration = record.iteration, "session resumed");

        self.spawn_driver(session.id.clone(), token, true);
        Ok(record)
    }

    /// Explicit merge of a completed or stopped isolated session.
    pub async fn merge(self: &Arc<Self>, id: &str) -> Result<Session> {
        let session = self
            .registry
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        if session.worktree.is_none() {
            return Err(Error::Invalid(format!("session {} has no worktree", id)));
        }
        if !session.status.is_mergeable() {
            return Err(Error::Invalid(format!(
                "session {} is {} and cannot be merged",
                id, session.status
            )));
        }
        self.merge_phase(&session.id).await
    }

    /// Cancel every live session and wait for the tasks to settle.
    pub async fn stop_all(&self, timeout: Duration) {
        let tokens: Vec<CancellationToken> = {
            let active = self.active.lock();
            active.values().cloned().collect()
        };
        if tokens.is_empty() {
            return;
        }
        info!(count = tokens.len(), "stopping running sessions");
        for token in tokens {
            token.cancel();
        }
        let deadline = tokio::time::Instant::now() + timeout;
        while self.active_count() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        if self.active_count() > 0 {
            warn!(remaining = self.active_count(), "sessions did not settle before timeout");
        }
    }

    fn resolve_workflow(&self, req: &StartSessionRequest) -> Result<Workflow> {
        if let Some(steps) = &req.steps {
            let name = req.workflow_name.clone().unwrap_or_else(|| "custom".into());
            return Ok(Workflow::new(name, steps.clone()));
        }
        let name = req
            .workflow_name
            .clone()
            .unwrap_or_else(|| self.config.defaults.workflow.clone());
        self.config.resolve_workflow(&name)
    }

    /// Atomically check capacity and claim a slot; exactly one of N+1
    /// concurrent starts gets the capacity error.
    fn reserve_slot(&self, id: &SessionId) -> Result<CancellationToken> {
        let mut active = self.active.lock();
        if active.len() >= self.config.max_concurrent_sessions {
            return Err(Error::Conflict(format!(
                "session capacity reached ({} running)",
                active.len()
            )));
        }
        let token = CancellationToken::new();
        active.insert(id.clone(), token.clone());
        Ok(token)
    }

    fn release_slot(&self, id: &SessionId) {
        self.active.lock().remove(id.as_str());
    }

    fn spawn_driver(self: &Arc<Self>, id: SessionId, token: CancellationToken, resume: bool) {
        let runner = Arc::clone(self);
        tokio::spawn(async move {
            runner.drive(id, token, resume).await;
        });
    }

    /// Run the engine and translate its outcome into a terminal status.
    async fn drive(self: Arc<Self>, id: SessionId, token: CancellationToken, resume: bool) {
        let engine = WorkflowEngine::new(Arc::clone(&self.registry), Arc::clone(&self.executor));
        let result = engine.run(&id, RunOptions { cancel: token, resume }).await;

        match result {
            Ok(()) => {
                let has_worktree =
                    self.registry.get(id.as_str()).and_then(|s| s.worktree).is_some();
                if let Err(e) =
                    self.registry.update_status(id.as_str(), SessionStatus::Completed, None)
                {
                    error!(session_id = %id, error = %e, "terminal transition failed");
                } else if has_worktree {
                    if let Err(e) = self.merge_phase(&id).await {
                        error!(session_id = %id, error = %e, "merge phase failed");
                    }
                }
            }
            Err(e) => {
                let (status, text) = self.classify(&id, e);
                if let Err(e) = self.registry.update_status(id.as_str(), status, Some(text)) {
                    error!(session_id = %id, error = %e, "terminal transition failed");
                }
            }
        }
        self.release_slot(&id);
    }

    /// Map an engine error to a terminal status and error text. Limit
    /// errors keep a stable prefix so clients recover the exit class.
    fn classify(&self, id: &SessionId, err: EngineError) -> (SessionStatus, String) {
        let session = self.registry.get(id.as_str());
        match err {
            EngineError::Core(Error::Cancelled) => {
                (SessionStatus::Stopped, "stopped before completion".into())
            }
            EngineError::Core(Error::LimitExceeded(kind)) => {
                let detail = match (&kind, &session) {
                    (LimitKind::MaxIterations, Some(s)) => {
                        format!("{} ({})", kind.error_prefix(), s.max_iterations)
                    }
                    (LimitKind::Budget, Some(s)) => format!(
                        "{} (${:.2} > ${:.2})",
                        kind.error_prefix(),
                        s.total_cost_usd,
                        s.max_budget_usd
                    ),
                    _ => kind.error_prefix().to_string(),
                };
                (SessionStatus::Failed, detail)
            }
            EngineError::GateFailed { .. } | EngineError::GateExhausted { .. } => {
                (SessionStatus::Failed, err.to_string())
            }
            EngineError::Core(other) => (SessionStatus::Failed, other.to_string()),
        }
    }

    /// `merging → merged` on verified success, `merging → conflict`
    /// otherwise. The worktree survives any failure.
    async fn merge_phase(&self, id: &SessionId) -> Result<Session> {
        let session = self
            .registry
            .get(id.as_str())
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        let descriptor = session
            .worktree
            .clone()
            .ok_or_else(|| Error::Invalid(format!("session {} has no worktree", id)))?;

        self.registry.update_status(id.as_str(), SessionStatus::Merging, None)?;
        let merge_result = self
            .worktrees
            .merge(
                &descriptor,
                self.executor.as_ref(),
                &session.model,
                CancellationToken::new(),
            )
            .await;

        match merge_result {
            Ok(outcome) => {
                if outcome.cost_usd > 0.0 {
                    if let Some(s) = self.registry.get(id.as_str()) {
                        let _ = self.registry.update_progress(
                            id.as_str(),
                            s.iteration,
                            s.total_cost_usd + outcome.cost_usd,
                            s.total_tokens_in,
                            s.total_tokens_out,
                        );
                    }
                }
                if outcome.success {
                    if let Err(e) = self.worktrees.cleanup(&descriptor).await {
                        warn!(session_id = %id, error = %e, "worktree cleanup failed after merge");
                    }
                    self.registry.clear_worktree(id.as_str())?;
                    self.registry.update_status(id.as_str(), SessionStatus::Merged, None)
                } else {
                    self.registry.update_status(
                        id.as_str(),
                        SessionStatus::Conflict,
                        Some(format!(
                            "merge failed; worktree preserved at {}",
                            descriptor.path.display()
                        )),
                    )
                }
            }
            Err(e) => self.registry.update_status(
                id.as_str(),
                SessionStatus::Conflict,
                Some(format!("merge phase error: {}", e)),
            ),
        }
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
