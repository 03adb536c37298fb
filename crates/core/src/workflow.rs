// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow and step definitions, prompt templating, gate markers.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Error;

/// Default per-step gate retry bound.
pub const DEFAULT_GATE_RETRIES: u32 = 3;

fn default_max_retries() -> u32 {
    DEFAULT_GATE_RETRIES
}

/// One step in a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    /// Prompt template; `{{files}}`, `{{plural}}` and `{{promise}}` are
    /// substituted at execution time.
    pub prompt: String,
    /// A gate step must emit a `GATE: PASS` marker to proceed.
    #[serde(default)]
    pub gate: bool,
    /// Step to jump to when the gate fails. Without it, a gate failure
    /// ends the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_fail: Option<String>,
    /// Bound on gate retries for this step.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl WorkflowStep {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            gate: false,
            on_fail: None,
            max_retries: DEFAULT_GATE_RETRIES,
        }
    }

    pub fn gated(mut self, on_fail: impl Into<String>) -> Self {
        self.gate = true;
        self.on_fail = Some(on_fail.into());
        self
    }
}

/// Named, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self { name: name.into(), steps }
    }

    /// Resolve a built-in workflow preset by name.
    pub fn builtin(name: &str) -> Option<Workflow> {
        match name {
            "build" => Some(Workflow::new(
                "build",
                vec![WorkflowStep::new(
                    "implement",
                    "Implement the specification{{plural}} in {{files}}. \
                     When every requirement is fully satisfied and verified, \
                     output {{promise}}.",
                )],
            )),
            "build-review" => Some(Workflow::new(
                "build-review",
                vec![
                    WorkflowStep::new(
                        "implement",
                        "Implement the specification{{plural}} in {{files}}. \
                         When every requirement is fully satisfied and verified, \
                         output {{promise}}.",
                    ),
                    WorkflowStep::new(
                        "review",
                        "Review the work against the specification{{plural}} in \
                         {{files}}. Output 'GATE: PASS' if the implementation \
                         satisfies the specification{{plural}}, otherwise output \
                         'GATE: FAIL' with the problems found.",
                    )
                    .gated("implement"),
                ],
            )),
            _ => None,
        }
    }

    /// Every `on_fail` target must name an existing step.
    pub fn validate(&self) -> Result<(), Error> {
        if self.steps.is_empty() {
            return Err(Error::Invalid(format!("workflow '{}' has no steps", self.name)));
        }
        for step in &self.steps {
            if let Some(target) = &step.on_fail {
                if !self.steps.iter().any(|s| &s.name == target) {
                    return Err(Error::Invalid(format!(
                        "workflow '{}': step '{}' redirects to unknown step '{}'",
                        self.name, step.name, target
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }
}

/// Substitute `{{files}}`, `{{plural}}` and `{{promise}}` in a step
/// template.
pub fn render_prompt(template: &str, spec_files: &[impl AsRef<Path>], promise: &str) -> String {
    let files = spec_files
        .iter()
        .map(|p| p.as_ref().display().to_string())
        .collect::<Vec<_>>()
        .join(" ");
    let plural = if spec_files.len() > 1 { "s" } else { "" };
    template
        .replace("{{files}}", &files)
        .replace("{{plural}}", plural)
        .replace("{{promise}}", promise)
}

/// Scan gate output for a `GATE: PASS` / `GATE: FAIL` marker.
///
/// Case-insensitive, tolerant of surrounding whitespace and of `:` or
/// `=` as the separator. The last marker in the text wins. `None` means
/// no marker was found; a gate without a pass marker is a failure.
pub fn gate_verdict(text: &str) -> Option<bool> {
    scan_marker(text, "GATE", "PASS", "FAIL")
}

/// Scan merge-phase output for `MERGE_SUCCESS: true` / `false`, with the
/// same tolerance as [`gate_verdict`].
pub fn merge_verdict(text: &str) -> Option<bool> {
    scan_marker(text, "MERGE_SUCCESS", "TRUE", "FALSE")
}

fn scan_marker(text: &str, key: &str, pass: &str, fail: &str) -> Option<bool> {
    let upper = text.to_uppercase();
    let mut verdict = None;
    let mut search = upper.as_str();
    while let Some(pos) = search.find(key) {
        let rest = search[pos + key.len()..].trim_start_matches([' ', '\t']);
        if let Some(rest) = rest.strip_prefix([':', '=']) {
            let rest = rest.trim_start_matches([' ', '\t']);
            if rest.starts_with(pass) {
                verdict = Some(true);
            } else if rest.starts_with(fail) {
                verdict = Some(false);
            }
        }
        search = &search[pos + key.len()..];
    }
    verdict
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
