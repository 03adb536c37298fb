// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted executor for engine, runner, and server tests.

use parking_lot::Mutex;
use std::collections::VecDeque;

use async_trait::async_trait;

use orbital_core::{Error, OutputEvent, Result};

use super::{AgentExecutor, ExecContext, ExecOutcome};

enum Script {
    Outcome(ExecOutcome),
    Fail(String),
    /// Block until the context is cancelled, then report `Cancelled`.
    HangUntilCancelled,
}

/// Replays scripted outcomes in order; records every prompt it was given.
///
/// When the script runs dry it returns an empty successful outcome.
#[derive(Default)]
pub struct FakeExecutor {
    scripts: Mutex<VecDeque<Script>>,
    prompts: Mutex<Vec<String>>,
    models: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful invocation emitting a single text event.
    pub fn push_text(&self, text: &str, cost_usd: f64) {
        self.push_outcome(ExecOutcome {
            output_text: text.to_string(),
            events: vec![OutputEvent::text(text)],
            cost_usd,
            tokens_in: 100,
            tokens_out: 50,
            exit_code: 0,
        });
    }

    pub fn push_outcome(&self, outcome: ExecOutcome) {
        self.scripts.lock().push_back(Script::Outcome(outcome));
    }

    pub fn push_failure(&self, message: &str) {
        self.scripts.lock().push_back(Script::Fail(message.to_string()));
    }

    pub fn push_hang(&self) {
        self.scripts.lock().push_back(Script::HangUntilCancelled);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn models(&self) -> Vec<String> {
        self.models.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl AgentExecutor for FakeExecutor {
    async fn execute(&self, ctx: ExecContext) -> Result<ExecOutcome> {
        self.prompts.lock().push(ctx.prompt.clone());
        self.models.lock().push(ctx.model.clone());
        let script = self.scripts.lock().pop_front();
        match script {
            Some(Script::Outcome(outcome)) => {
                if let Some(sink) = &ctx.sink {
                    for event in &outcome.events {
                        sink(event.clone());
                    }
                }
                Ok(outcome)
            }
            Some(Script::Fail(message)) => Err(Error::ExternalTool(message)),
            Some(Script::HangUntilCancelled) => {
                ctx.cancel.cancelled().await;
                Err(Error::Cancelled)
            }
            None => Ok(ExecOutcome::default()),
        }
    }
}
