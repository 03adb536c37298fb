// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrency-cap specs: N+1 parallel starts yield exactly one error.

use super::prelude::*;

const SLOW_AGENT: &str = r#"echo '{"type":"text","text":"working"}'
sleep 30"#;

#[tokio::test]
async fn parallel_overflow_start_gets_exactly_one_conflict() {
    let capacity = 2;
    let project = Project::with_agent_and_capacity(SLOW_AGENT, capacity);

    let mut handles = Vec::new();
    for _ in 0..capacity + 1 {
        let runner = project.runner.clone();
        let request = project.spec_request();
        handles.push(tokio::spawn(async move { runner.start(request).await }));
    }

    let mut ok = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(session) => ok.push(session),
            Err(orbital_core::Error::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(conflicts, 1);
    assert_eq!(ok.len(), capacity);
    assert_eq!(project.runner.active_count(), capacity);

    // Wind down: every started session settles as stopped.
    project
        .runner
        .stop_all(std::time::Duration::from_secs(10))
        .await;
    for session in ok {
        let done = project.wait_terminal(session.id.as_str()).await;
        assert_eq!(done.status, SessionStatus::Stopped);
    }
    assert_eq!(project.runner.active_count(), 0);
}

#[tokio::test]
async fn slot_released_after_completion_allows_new_start() {
    let project = Project::with_agent_and_capacity(
        r#"echo '{"type":"text","text":"ORBITAL_COMPLETE"}'
echo '{"type":"result","cost_usd":0.01}'"#,
        1,
    );

    let first = project.runner.start(project.spec_request()).await.unwrap();
    project.wait_terminal(first.id.as_str()).await;

    // Capacity freed: a second start succeeds.
    let second = project.runner.start(project.spec_request()).await.unwrap();
    let done = project.wait_terminal(second.id.as_str()).await;
    assert_eq!(done.status, SessionStatus::Completed);
}
