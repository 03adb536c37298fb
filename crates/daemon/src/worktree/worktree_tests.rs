// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::executor::fake::FakeExecutor;
use crate::executor::ExecOutcome;

/// Initialize a repo with one commit on `main`.
async fn init_repo(dir: &Path) {
    run_git(dir, &["init", "--initial-branch=main"]).await.unwrap();
    run_git(dir, &["config", "user.email", "test@example.com"]).await.unwrap();
    run_git(dir, &["config", "user.name", "Test"]).await.unwrap();
    std::fs::write(dir.join("README.md"), "hello\n").unwrap();
    run_git(dir, &["add", "."]).await.unwrap();
    run_git(dir, &["commit", "-m", "initial"]).await.unwrap();
}

struct Harness {
    manager: WorktreeManager,
    temp: tempfile::TempDir,
}

impl Harness {
    async fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        init_repo(temp.path()).await;
        let paths = ProjectPaths::new(temp.path());
        paths.ensure_dirs().unwrap();
        Self { manager: WorktreeManager::new(paths), temp }
    }

    async fn create(&self) -> WorktreeDescriptor {
        self.manager
            .create(vec![self.temp.path().join("spec.md")], SessionId::generate())
            .await
            .unwrap()
    }
}

fn merge_success_executor(marker: &str) -> FakeExecutor {
    let executor = FakeExecutor::new();
    executor.push_outcome(ExecOutcome {
        output_text: marker.to_string(),
        events: vec![],
        cost_usd: 0.05,
        tokens_in: 10,
        tokens_out: 5,
        exit_code: 0,
    });
    executor
}

// ── Create ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_makes_branch_checkout_and_descriptor() {
    let h = Harness::new().await;
    let descriptor = h.create().await;

    assert!(descriptor.path.is_dir());
    assert!(descriptor.branch.starts_with("orbital/"));
    assert_eq!(descriptor.original_branch, "main");
    assert!(git_succeeds(h.temp.path(), &["rev-parse", "--verify", &descriptor.branch]).await);

    let listed = h.manager.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, descriptor.name);
}

#[tokio::test]
async fn create_twice_yields_distinct_names() {
    let h = Harness::new().await;
    let a = h.create().await;
    let b = h.create().await;
    assert_ne!(a.name, b.name);
    assert_eq!(h.manager.list().unwrap().len(), 2);
}

#[tokio::test]
async fn find_by_name_and_remove() {
    let h = Harness::new().await;
    let descriptor = h.create().await;

    assert!(h.manager.find_by_name(&descriptor.name).unwrap().is_some());
    assert!(h.manager.find_by_name("no-such").unwrap().is_none());

    h.manager.remove(&descriptor.path).unwrap();
    assert!(h.manager.find_by_name(&descriptor.name).unwrap().is_none());
    assert!(matches!(
        h.manager.remove(&descriptor.path),
        Err(Error::NotFound(_))
    ));
}

// ── Merge ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn merge_with_marker_and_containment_succeeds() {
    let h = Harness::new().await;
    let descriptor = h.create().await;
    // No commits on the isolation branch: its HEAD equals main's, so
    // containment already holds once the agent reports success.
    let executor = merge_success_executor("rebased\nMERGE_SUCCESS: true");

    let outcome = h
        .manager
        .merge(&descriptor, &executor, "test-model", CancellationToken::new())
        .await
        .unwrap();
    assert!(outcome.success);
    assert!((outcome.cost_usd - 0.05).abs() < 1e-9);
}

#[tokio::test]
async fn merge_agent_failure_preserves_worktree() {
    let h = Harness::new().await;
    let descriptor = h.create().await;
    let executor = merge_success_executor("conflict in README\nMERGE_SUCCESS: false");

    let outcome = h
        .manager
        .merge(&descriptor, &executor, "test-model", CancellationToken::new())
        .await
        .unwrap();
    assert!(!outcome.success);
    assert!(descriptor.path.is_dir());
    assert_eq!(h.manager.list().unwrap().len(), 1);
}

#[tokio::test]
async fn merge_verification_catches_lying_agent() {
    let h = Harness::new().await;
    let descriptor = h.create().await;
    // A commit on the isolation branch that never lands on main.
    std::fs::write(descriptor.path.join("work.txt"), "changes\n").unwrap();
    run_git(&descriptor.path, &["add", "."]).await.unwrap();
    run_git(&descriptor.path, &["commit", "-m", "work"]).await.unwrap();

    let executor = merge_success_executor("MERGE_SUCCESS: true");
    let outcome = h
        .manager
        .merge(&descriptor, &executor, "test-model", CancellationToken::new())
        .await
        .unwrap();
    assert!(!outcome.success);
}

#[tokio::test]
async fn merge_with_missing_branch_errors() {
    let h = Harness::new().await;
    let mut descriptor = h.create().await;
    descriptor.branch = "orbital/never-created".into();
    let executor = FakeExecutor::new();
    let err = h
        .manager
        .merge(&descriptor, &executor, "test-model", CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ExternalTool(_)));
}

// ── Cleanup and orphans ──────────────────────────────────────────────────────

#[tokio::test]
async fn cleanup_removes_directory_branch_and_descriptor() {
    let h = Harness::new().await;
    let descriptor = h.create().await;

    h.manager.cleanup(&descriptor).await.unwrap();
    assert!(!descriptor.path.exists());
    assert!(!git_succeeds(h.temp.path(), &["rev-parse", "--verify", &descriptor.branch]).await);
    assert!(h.manager.list().unwrap().is_empty());
}

#[tokio::test]
async fn cleanup_force_deletes_unmerged_branch() {
    let h = Harness::new().await;
    let descriptor = h.create().await;
    std::fs::write(descriptor.path.join("work.txt"), "unmerged\n").unwrap();
    run_git(&descriptor.path, &["add", "."]).await.unwrap();
    run_git(&descriptor.path, &["commit", "-m", "unmerged"]).await.unwrap();

    h.manager.cleanup(&descriptor).await.unwrap();
    assert!(!git_succeeds(h.temp.path(), &["rev-parse", "--verify", &descriptor.branch]).await);
}

#[tokio::test]
async fn orphan_report_classifies_all_three_kinds() {
    let h = Harness::new().await;
    let stale = h.create().await;
    let kept = h.create().await;

    // Stale: descriptor whose checkout is gone (removed outside git).
    run_git(h.temp.path(), &["worktree", "remove", "--force", &stale.path.display().to_string()])
        .await
        .unwrap();

    // Orphan branch: an orbital/* branch nobody tracks.
    run_git(h.temp.path(), &["branch", "orbital/untracked"]).await.unwrap();

    // Orphan dir: a directory under worktrees/ without a descriptor.
    let loose_dir = h.manager.paths.worktrees_dir().join("loose");
    std::fs::create_dir_all(&loose_dir).unwrap();

    let report = h.manager.orphans().await.unwrap();
    assert_eq!(report.stale.len(), 1);
    assert_eq!(report.stale[0].name, stale.name);
    assert_eq!(report.orphan_branches, vec!["orbital/untracked".to_string()]);
    assert_eq!(report.orphan_dirs, vec![loose_dir]);

    // The healthy worktree is in none of the buckets.
    assert!(!report.stale.iter().any(|w| w.name == kept.name));
}

#[tokio::test]
async fn empty_project_has_no_orphans() {
    let h = Harness::new().await;
    let report = h.manager.orphans().await.unwrap();
    assert_eq!(report, OrphanReport::default());
}
