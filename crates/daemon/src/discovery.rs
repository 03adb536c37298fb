// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery of resumable sessions from persisted state.
//!
//! Read-only: callers decide what to clean up. The registry envelope is
//! authoritative; the legacy per-project single-session file is a
//! fallback keyed by its `SessionID` field.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use orbital_core::{Result, Session, SessionStatus};
use orbital_storage::{read_json, ProjectPaths};

/// A persisted session with a liveness verdict.
#[derive(Debug, Clone)]
pub struct DiscoveredSession {
    pub session: Session,
    pub valid: bool,
    /// Human-readable reason when invalid.
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    sessions: HashMap<String, Session>,
}

/// Candidate statuses: anything a user could pick up again. Terminal
/// successes and failures have nothing to resume.
fn is_candidate(status: SessionStatus) -> bool {
    matches!(
        status,
        SessionStatus::Running
            | SessionStatus::Merging
            | SessionStatus::Interrupted
            | SessionStatus::Stopped
    )
}

/// Build the list of resumable sessions for a project.
pub fn discover_sessions(project_dir: &Path) -> Result<Vec<DiscoveredSession>> {
    let paths = ProjectPaths::new(project_dir);
    let envelope = read_json::<Envelope>(&paths.daemon_state())?.unwrap_or_default();

    let mut seen: Vec<String> = Vec::new();
    let mut discovered = Vec::new();
    for (id, session) in envelope.sessions {
        seen.push(id);
        if !is_candidate(session.status) {
            continue;
        }
        discovered.push(classify(session));
    }

    if let Some(legacy) = read_legacy(&paths) {
        if !seen.contains(&legacy.id.to_string()) && is_candidate(legacy.status) {
            debug!(session_id = %legacy.id, "found legacy single-session record");
            discovered.push(classify(legacy));
        }
    }

    discovered.sort_by(|a, b| a.session.started_at.cmp(&b.session.started_at));
    Ok(discovered)
}

fn classify(session: Session) -> DiscoveredSession {
    if let Some(pid) = session.pid {
        if process_alive(pid) {
            return DiscoveredSession {
                reason: Some(format!("daemon still running (pid {})", pid)),
                valid: false,
                session,
            };
        }
    }
    if let Some(worktree) = &session.worktree {
        if !worktree.path.exists() {
            return DiscoveredSession {
                reason: Some(format!(
                    "worktree missing at {}",
                    worktree.path.display()
                )),
                valid: false,
                session,
            };
        }
    }
    DiscoveredSession { session, valid: true, reason: None }
}

/// kill-0 probe. A live pid owned by another user means the pid was
/// recycled, so the record counts as stale.
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}

/// The legacy file is a session record with a `SessionID` key; newer
/// records also carry `id`, older ones only the legacy key.
fn read_legacy(paths: &ProjectPaths) -> Option<Session> {
    let mut value = read_json::<serde_json::Value>(&paths.legacy_state()).ok()??;
    let legacy_id = value.get("SessionID")?.as_str()?.to_string();
    let obj = value.as_object_mut()?;
    obj.entry("id").or_insert_with(|| serde_json::Value::String(legacy_id));
    serde_json::from_value(value).ok()
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
