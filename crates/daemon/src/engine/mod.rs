// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow engine: sequential step execution with gate/retry logic.
//!
//! One call to [`WorkflowEngine::run`] drives a session until it
//! completes, fails a gate, hits a limit, or is cancelled. Terminal
//! status transitions are the runner's job; the engine only checkpoints
//! progress and gate retries through the registry.

pub mod completion;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error as ThisError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use orbital_core::{
    gate_verdict, render_prompt, Error, LimitKind, OutputEvent, Session, SessionId, Workflow,
};

use crate::executor::{AgentExecutor, ExecContext, ExecOutcome};
use crate::registry::SessionRegistry;
use completion::CompletionDetector;

/// Tolerance for floating-point budget arithmetic.
pub const BUDGET_EPSILON: f64 = 1e-9;

#[derive(Debug, ThisError)]
pub enum EngineError {
    #[error("gate step '{step}' failed with no on_fail target")]
    GateFailed { step: String },

    #[error("gate step '{step}' failed after {retries} retries")]
    GateExhausted { step: String, retries: u32 },

    #[error(transparent)]
    Core(#[from] Error),
}

/// How a run enters the iteration loop.
pub struct RunOptions {
    pub cancel: CancellationToken,
    /// Re-enter the checkpointed iteration instead of advancing past it.
    pub resume: bool,
}

pub struct WorkflowEngine {
    registry: Arc<SessionRegistry>,
    executor: Arc<dyn AgentExecutor>,
}

impl WorkflowEngine {
    pub fn new(registry: Arc<SessionRegistry>, executor: Arc<dyn AgentExecutor>) -> Self {
        Self { registry, executor }
    }

    /// Drive the session's workflow to a conclusion.
    ///
    /// `Ok(())` means the completion promise was detected. Every other
    /// outcome surfaces as an error for the runner to translate.
    pub async fn run(&self, id: &SessionId, opts: RunOptions) -> Result<(), EngineError> {
        let mut reenter = opts.resume;
        loop {
            let session = self
                .registry
                .get(id.as_str())
                .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
            let workflow = Workflow::new(session.workflow.clone(), session.steps.clone());
            workflow.validate()?;

            if opts.cancel.is_cancelled() {
                return Err(Error::Cancelled.into());
            }

            // A resumed session re-runs its checkpointed iteration.
            let iteration = if reenter && session.iteration > 0 {
                session.iteration
            } else {
                session.iteration + 1
            };
            reenter = false;

            if iteration > session.max_iterations {
                return Err(Error::LimitExceeded(LimitKind::MaxIterations).into());
            }
            if session.total_cost_usd > session.max_budget_usd + BUDGET_EPSILON {
                return Err(Error::LimitExceeded(LimitKind::Budget).into());
            }

            self.registry.update_progress(
                id.as_str(),
                iteration,
                session.total_cost_usd,
                session.total_tokens_in,
                session.total_tokens_out,
            )?;
            debug!(session_id = %id, iteration, "iteration started");

            if self.run_iteration(&session, iteration, &opts.cancel).await? {
                info!(session_id = %id, iteration, "completion promise detected");
                return Ok(());
            }
        }
    }

    /// One full pass over the step list. Returns true on completion.
    async fn run_iteration(
        &self,
        session: &Session,
        iteration: u32,
        cancel: &CancellationToken,
    ) -> Result<bool, EngineError> {
        let id = &session.id;
        let workflow = Workflow::new(session.workflow.clone(), session.steps.clone());
        let detector = CompletionDetector::new(session.completion_promise.clone());
        let deadline = session
            .iteration_timeout_secs
            .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));

        let mut totals = (
            session.total_cost_usd,
            session.total_tokens_in,
            session.total_tokens_out,
        );
        let mut idx = 0;
        while idx < workflow.steps.len() {
            let step = &workflow.steps[idx];
            if cancel.is_cancelled() {
                return Err(Error::Cancelled.into());
            }
            let _ = self.registry.broadcast(
                id.as_str(),
                OutputEvent::status(format!("iteration {}: step '{}'", iteration, step.name)),
            );

            let prompt =
                render_prompt(&step.prompt, &session.spec_files, &session.completion_promise);
            let outcome = self.execute_step(session, step.gate, prompt, deadline, cancel).await?;

            totals.0 += outcome.cost_usd;
            totals.1 += outcome.tokens_in;
            totals.2 += outcome.tokens_out;
            self.registry
                .update_progress(id.as_str(), iteration, totals.0, totals.1, totals.2)?;

            if step.gate {
                // A failing gate wins over anything else in the output.
                if gate_verdict(&outcome.output_text) == Some(true) {
                    idx += 1;
                    continue;
                }
                let retries = self
                    .registry
                    .get(id.as_str())
                    .map(|s| s.gate_retry_count(&step.name))
                    .unwrap_or(0);
                if retries >= step.max_retries {
                    return Err(EngineError::GateExhausted {
                        step: step.name.clone(),
                        retries,
                    });
                }
                let Some(target) = &step.on_fail else {
                    return Err(EngineError::GateFailed { step: step.name.clone() });
                };
                self.registry.record_gate_retry(id.as_str(), &step.name)?;
                debug!(session_id = %id, step = %step.name, target = %target, "gate failed, redirecting");
                idx = workflow.step_index(target).ok_or_else(|| {
                    Error::Invalid(format!("on_fail target '{}' disappeared", target))
                })?;
            } else if detector.check(&outcome.output_text) {
                return Ok(true);
            } else {
                idx += 1;
            }
        }
        Ok(false)
    }

    async fn execute_step(
        &self,
        session: &Session,
        gate: bool,
        prompt: String,
        deadline: Option<tokio::time::Instant>,
        cancel: &CancellationToken,
    ) -> Result<ExecOutcome, EngineError> {
        let step_cancel = cancel.child_token();
        let registry = Arc::clone(&self.registry);
        let sink_id = session.id.clone();
        let ctx = ExecContext {
            working_dir: session.effective_working_dir().to_path_buf(),
            prompt,
            // Gates are checked with the checker model.
            model: if gate { session.checker_model.clone() } else { session.model.clone() },
            dangerously_skip_permissions: session.dangerously_skip_permissions,
            cancel: step_cancel.clone(),
            sink: Some(Arc::new(move |event| {
                let _ = registry.broadcast(sink_id.as_str(), event);
            })),
        };

        let exec = self.executor.execute(ctx);
        match deadline {
            None => Ok(exec.await?),
            Some(deadline) => {
                tokio::select! {
                    outcome = exec => Ok(outcome?),
                    _ = tokio::time::sleep_until(deadline) => {
                        step_cancel.cancel();
                        Err(Error::LimitExceeded(LimitKind::Deadline).into())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
