// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion-promise detection in agent output.

use tracing::trace;

/// Looks for the configured completion promise in agent output.
///
/// Output may still contain raw JSON event lines (when an agent prints
/// them outside the normal stream); human-readable text is extracted
/// from `text` events, and tool payloads and non-text events are
/// ignored. Matching is verbatim and case-sensitive.
pub struct CompletionDetector {
    promise: String,
}

impl CompletionDetector {
    pub fn new(promise: impl Into<String>) -> Self {
        Self { promise: promise.into() }
    }

    pub fn check(&self, output_text: &str) -> bool {
        if self.promise.is_empty() {
            return false;
        }
        let found = output_text.lines().any(|line| self.line_matches(line));
        if found {
            trace!("completion promise found");
        }
        found
    }

    fn line_matches(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        if trimmed.starts_with('{') {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
                return match value.get("type").and_then(|t| t.as_str()) {
                    Some("text") => value
                        .get("text")
                        .and_then(|v| v.as_str())
                        .is_some_and(|t| t.contains(self.promise.as_str())),
                    _ => false,
                };
            }
        }
        line.contains(self.promise.as_str())
    }
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;
