// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent subprocess execution.
//!
//! The agent is an opaque command (configurable, `claude` by default)
//! invoked with CWD set to the session's effective working directory and
//! the composed prompt as its final argument. It emits line-delimited
//! JSON events on stdout:
//!
//! ```text
//! {"type":"text","text":"..."}
//! {"type":"tool","payload":"..."}
//! {"type":"status","payload":"..."}
//! {"type":"error","payload":"..."}
//! {"type":"result","cost_usd":0.12,"tokens_in":1000,"tokens_out":200}
//! ```
//!
//! Lines that do not parse as JSON are treated as plain text output.
//! A non-zero exit without a terminal `result` event is an error.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use orbital_core::{Error, EventKind, OutputEvent, Result};

#[cfg(test)]
pub mod fake;

/// Grace period between the polite signal and the hard kill.
const CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Sink receiving each event as it is parsed (the registry broadcaster).
pub type EventSink = Arc<dyn Fn(OutputEvent) + Send + Sync>;

/// Everything one agent invocation needs.
pub struct ExecContext {
    pub working_dir: PathBuf,
    pub prompt: String,
    pub model: String,
    pub dangerously_skip_permissions: bool,
    pub cancel: CancellationToken,
    pub sink: Option<EventSink>,
}

/// Aggregated result of one agent invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecOutcome {
    /// Human-readable text extracted from `text` events.
    pub output_text: String,
    pub events: Vec<OutputEvent>,
    pub cost_usd: f64,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub exit_code: i32,
}

#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(&self, ctx: ExecContext) -> Result<ExecOutcome>;
}

/// Spawns the real agent subprocess.
pub struct ProcessExecutor {
    command: String,
    max_output_size: usize,
}

impl ProcessExecutor {
    pub fn new(command: impl Into<String>, max_output_size: usize) -> Self {
        Self { command: command.into(), max_output_size }
    }

    async fn terminate(child: &mut Child) {
        if let Some(pid) = child.id() {
            let pid = nix::unistd::Pid::from_raw(pid as i32);
            if nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGINT).is_ok() {
                if tokio::time::timeout(CANCEL_GRACE, child.wait()).await.is_ok() {
                    return;
                }
                warn!("agent ignored SIGINT, killing");
            }
        }
        let _ = child.kill().await;
    }
}

#[async_trait]
impl AgentExecutor for ProcessExecutor {
    async fn execute(&self, ctx: ExecContext) -> Result<ExecOutcome> {
        let mut cmd = Command::new(&self.command);
        cmd.current_dir(&ctx.working_dir)
            .arg("--model")
            .arg(&ctx.model)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if ctx.dangerously_skip_permissions {
            cmd.arg("--dangerously-skip-permissions");
        }
        cmd.arg(&ctx.prompt);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::ExternalTool(format!("spawn {}: {}", self.command, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ExternalTool("agent stdout unavailable".into()))?;
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut state = StreamState::new(self.max_output_size, ctx.sink.clone());

        loop {
            tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    Self::terminate(&mut child).await;
                    stderr_task.abort();
                    return Err(Error::Cancelled);
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => state.ingest(&line),
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "agent stdout read failed");
                        break;
                    }
                },
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| Error::ExternalTool(format!("wait for agent: {}", e)))?;
        let stderr_text = stderr_task.await.unwrap_or_default();
        let exit_code = status.code().unwrap_or(-1);

        if !status.success() && !state.saw_result {
            let tail: String = stderr_text.lines().rev().take(5).collect::<Vec<_>>().join("; ");
            return Err(Error::ExternalTool(format!(
                "agent exited with code {} before reporting a result{}{}",
                exit_code,
                if tail.is_empty() { "" } else { ": " },
                tail
            )));
        }

        Ok(state.into_outcome(exit_code))
    }
}

/// Accumulates the parsed event stream for one invocation.
struct StreamState {
    max_output_size: usize,
    sink: Option<EventSink>,
    output_text: String,
    events: Vec<OutputEvent>,
    cost_usd: f64,
    tokens_in: u64,
    tokens_out: u64,
    saw_result: bool,
    bytes: usize,
    truncated: bool,
}

impl StreamState {
    fn new(max_output_size: usize, sink: Option<EventSink>) -> Self {
        Self {
            max_output_size,
            sink,
            output_text: String::new(),
            events: Vec::new(),
            cost_usd: 0.0,
            tokens_in: 0,
            tokens_out: 0,
            saw_result: false,
            bytes: 0,
            truncated: false,
        }
    }

    fn ingest(&mut self, line: &str) {
        let value: Option<serde_json::Value> = serde_json::from_str(line).ok();
        let Some(value) = value else {
            // Plain agent chatter outside the event stream.
            self.record(OutputEvent::text(line));
            return;
        };

        let kind = value.get("type").and_then(|t| t.as_str());
        match kind {
            Some("text") => self.record(OutputEvent::text(payload_of(&value))),
            Some("tool") => self.record(OutputEvent::tool(payload_of(&value))),
            Some("status") => self.record(OutputEvent::status(payload_of(&value))),
            Some("error") => self.record(OutputEvent::error(payload_of(&value))),
            Some("result") | Some("usage") => {
                if kind == Some("result") {
                    self.saw_result = true;
                }
                self.cost_usd += value.get("cost_usd").and_then(|v| v.as_f64()).unwrap_or(0.0);
                self.tokens_in += value.get("tokens_in").and_then(|v| v.as_u64()).unwrap_or(0);
                self.tokens_out += value.get("tokens_out").and_then(|v| v.as_u64()).unwrap_or(0);
            }
            other => debug!(kind = ?other, "ignoring unknown agent event"),
        }
    }

    fn record(&mut self, event: OutputEvent) {
        if self.truncated {
            return;
        }
        if self.bytes + event.payload.len() > self.max_output_size {
            self.truncated = true;
            let notice = OutputEvent::error(format!(
                "output truncated at {} bytes",
                self.max_output_size
            ));
            if let Some(sink) = &self.sink {
                sink(notice.clone());
            }
            self.events.push(notice);
            return;
        }
        self.bytes += event.payload.len();
        if event.kind == EventKind::Text {
            if !self.output_text.is_empty() {
                self.output_text.push('\n');
            }
            self.output_text.push_str(&event.payload);
        }
        if let Some(sink) = &self.sink {
            sink(event.clone());
        }
        self.events.push(event);
    }

    fn into_outcome(self, exit_code: i32) -> ExecOutcome {
        ExecOutcome {
            output_text: self.output_text,
            events: self.events,
            cost_usd: self.cost_usd,
            tokens_in: self.tokens_in,
            tokens_out: self.tokens_out,
            exit_code,
        }
    }
}

fn payload_of(value: &serde_json::Value) -> String {
    for key in ["text", "payload", "message", "content"] {
        if let Some(s) = value.get(key).and_then(|v| v.as_str()) {
            return s.to_string();
        }
    }
    String::new()
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
