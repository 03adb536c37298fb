// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output events streamed from agent subprocesses to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind tag for an output event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Text,
    Tool,
    Status,
    Error,
}

/// A single event in a session's output stream.
///
/// Events are appended to the session's history ring buffer and fanned
/// out to any live subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub payload: String,
    pub timestamp: DateTime<Utc>,
}

impl OutputEvent {
    pub fn new(kind: EventKind, payload: impl Into<String>) -> Self {
        Self { kind, payload: payload.into(), timestamp: Utc::now() }
    }

    pub fn text(payload: impl Into<String>) -> Self {
        Self::new(EventKind::Text, payload)
    }

    pub fn tool(payload: impl Into<String>) -> Self {
        Self::new(EventKind::Tool, payload)
    }

    pub fn status(payload: impl Into<String>) -> Self {
        Self::new(EventKind::Status, payload)
    }

    pub fn error(payload: impl Into<String>) -> Self {
        Self::new(EventKind::Error, payload)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
