// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-safety specs for the durable state files.

use super::prelude::*;

fn state_path(project: &Project) -> std::path::PathBuf {
    ProjectPaths::new(project.temp.path()).daemon_state()
}

fn seeded_project() -> (Project, Session) {
    let project = Project::with_agent("true");
    let session = SessionBuilder::new().status(SessionStatus::Stopped).build();
    project.registry.add(session.clone()).unwrap();
    (project, session)
}

#[tokio::test]
async fn torn_primary_write_recovers_from_backup() {
    let (project, session) = seeded_project();
    // Second write creates the .bak sibling.
    project
        .registry
        .update_progress(session.id.as_str(), 3, 0.5, 10, 5)
        .unwrap();

    // Crash mid-write: primary is garbage, backup intact.
    std::fs::write(state_path(&project), b"{\"sessions\": {").unwrap();

    let reloaded = SessionRegistry::load(state_path(&project)).unwrap();
    let record = reloaded.get(session.id.as_str()).unwrap();
    // The backup predates the torn write but is self-consistent.
    assert_eq!(record.id, session.id);
    assert_eq!(record.status, SessionStatus::Stopped);
}

#[tokio::test]
async fn orphaned_tmp_file_is_swept_on_load() {
    let (project, _session) = seeded_project();
    let tmp = state_path(&project).with_extension("json.tmp");
    std::fs::write(&tmp, b"{ half a write").unwrap();

    SessionRegistry::load(state_path(&project)).unwrap();
    assert!(!tmp.exists());
}

#[tokio::test]
async fn deleted_primary_recovers_from_backup() {
    let (project, session) = seeded_project();
    project
        .registry
        .update_progress(session.id.as_str(), 1, 0.1, 1, 1)
        .unwrap();
    std::fs::remove_file(state_path(&project)).unwrap();

    let reloaded = SessionRegistry::load(state_path(&project)).unwrap();
    assert!(reloaded.get(session.id.as_str()).is_some());
}

#[tokio::test]
async fn conflict_status_survives_restart() {
    let (project, session) = seeded_project();
    project
        .registry
        .update_status(session.id.as_str(), SessionStatus::Conflict, Some("merge failed".into()))
        .unwrap();

    let reloaded = SessionRegistry::load(state_path(&project)).unwrap();
    let record = reloaded.get(session.id.as_str()).unwrap();
    assert_eq!(record.status, SessionStatus::Conflict);
    assert_eq!(record.error.as_deref(), Some("merge failed"));
}
