// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session status set and transition predicates.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a session.
///
/// `Pending`, `Running`, and `Merging` are live; everything else is
/// terminal and preserves the record for history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Running,
    Merging,
    Completed,
    Merged,
    Failed,
    Conflict,
    Stopped,
    Interrupted,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending | SessionStatus::Running | SessionStatus::Merging)
    }

    /// Statuses `resume` accepts.
    pub fn is_resumable(&self) -> bool {
        matches!(self, SessionStatus::Interrupted | SessionStatus::Stopped)
    }

    /// Statuses an explicit `merge` accepts (a worktree must also exist).
    pub fn is_mergeable(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Stopped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Running => "running",
            SessionStatus::Merging => "merging",
            SessionStatus::Completed => "completed",
            SessionStatus::Merged => "merged",
            SessionStatus::Failed => "failed",
            SessionStatus::Conflict => "conflict",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Interrupted => "interrupted",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
