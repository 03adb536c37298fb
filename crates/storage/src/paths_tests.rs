// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn layout_matches_contract() {
    let paths = ProjectPaths::new("/p");
    assert_eq!(paths.root(), Path::new("/p/.orbital"));
    assert_eq!(paths.socket(), Path::new("/p/.orbital/daemon.sock"));
    assert_eq!(paths.pid_file(), Path::new("/p/.orbital/daemon.pid"));
    assert_eq!(paths.daemon_state(), Path::new("/p/.orbital/daemon-state.json"));
    assert_eq!(paths.legacy_state(), Path::new("/p/.orbital/state/state.json"));
    assert_eq!(paths.queue_file(), Path::new("/p/.orbital/state/queue.json"));
    assert_eq!(paths.queue_lock(), Path::new("/p/.orbital/state/queue.lock"));
    assert_eq!(paths.worktree_state(), Path::new("/p/.orbital/state/worktrees.json"));
    assert_eq!(paths.worktrees_dir(), Path::new("/p/.orbital/worktrees"));
    assert_eq!(
        paths.worktree_checkout("quiet-otter"),
        Path::new("/p/.orbital/worktrees/quiet-otter")
    );
}

#[test]
fn ensure_dirs_creates_the_tree() {
    let temp = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(temp.path());
    paths.ensure_dirs().unwrap();
    assert!(paths.state_dir().is_dir());
    assert!(paths.worktrees_dir().is_dir());
}

#[test]
fn ensure_dirs_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(temp.path());
    paths.ensure_dirs().unwrap();
    paths.ensure_dirs().unwrap();
}
