// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end session specs with a real agent subprocess.

use super::prelude::*;

const COMPLETING_AGENT: &str = r#"echo '{"type":"text","text":"working on it"}'
echo '{"type":"text","text":"ORBITAL_COMPLETE"}'
echo '{"type":"result","cost_usd":0.25,"tokens_in":500,"tokens_out":100}'"#;

#[tokio::test]
async fn session_runs_to_completion_with_subprocess_agent() {
    let project = Project::with_agent(COMPLETING_AGENT);
    let record = project.runner.start(project.spec_request()).await.unwrap();

    let done = project.wait_terminal(record.id.as_str()).await;
    assert_eq!(done.status, SessionStatus::Completed);
    assert_eq!(done.iteration, 1);
    assert!((done.total_cost_usd - 0.25).abs() < 1e-9);
    assert_eq!(done.total_tokens_in, 500);
}

#[tokio::test]
async fn persisted_record_equals_registry_record() {
    let project = Project::with_agent(COMPLETING_AGENT);
    let record = project.runner.start(project.spec_request()).await.unwrap();
    let done = project.wait_terminal(record.id.as_str()).await;

    let state = read_state_file(project.temp.path());
    let persisted: Session = serde_json::from_value(
        state["sessions"][done.id.as_str()].clone(),
    )
    .unwrap();
    assert_eq!(persisted, done);
}

#[tokio::test]
async fn failing_agent_marks_session_failed() {
    let project = Project::with_agent("echo 'agent on fire' >&2\nexit 7");
    let record = project.runner.start(project.spec_request()).await.unwrap();

    let done = project.wait_terminal(record.id.as_str()).await;
    assert_eq!(done.status, SessionStatus::Failed);
    assert!(done.error.unwrap().contains("code 7"));
}

#[tokio::test]
async fn iteration_cap_reports_limit_error() {
    let project = Project::with_agent(
        r#"echo '{"type":"text","text":"never done"}'
echo '{"type":"result","cost_usd":0.01}'"#,
    );
    let mut request = project.spec_request();
    request.max_iterations = Some(2);
    let record = project.runner.start(request).await.unwrap();

    let done = project.wait_terminal(record.id.as_str()).await;
    assert_eq!(done.status, SessionStatus::Failed);
    assert_eq!(done.iteration, 2);
    assert!(done.error.unwrap().starts_with("max iterations reached"));
}

#[tokio::test]
async fn stop_interrupts_a_live_subprocess() {
    let project = Project::with_agent(
        r#"echo '{"type":"text","text":"settling in"}'
sleep 30"#,
    );
    let record = project.runner.start(project.spec_request()).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    project.runner.stop(record.id.as_str()).unwrap();
    let done = project.wait_terminal(record.id.as_str()).await;
    assert_eq!(done.status, SessionStatus::Stopped);
}

#[tokio::test]
async fn registry_reload_interrupts_live_records() {
    let project = Project::with_agent(COMPLETING_AGENT);
    let record = project.runner.start(project.spec_request()).await.unwrap();
    project.wait_terminal(record.id.as_str()).await;

    // Fabricate a crash: flip the persisted record back to running,
    // then reload as a fresh daemon would.
    let mut state = read_state_file(project.temp.path());
    state["sessions"][record.id.as_str()]["status"] = "running".into();
    let path = ProjectPaths::new(project.temp.path()).daemon_state();
    std::fs::write(&path, serde_json::to_vec(&state).unwrap()).unwrap();

    let reloaded = SessionRegistry::load(path).unwrap();
    assert_eq!(
        reloaded.get(record.id.as_str()).unwrap().status,
        SessionStatus::Interrupted
    );
}
