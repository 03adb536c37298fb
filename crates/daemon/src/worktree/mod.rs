// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worktree lifecycle: isolation branches, the merge phase, orphan
//! detection.
//!
//! Descriptors are tracked in `<project>/.orbital/state/worktrees.json`
//! with the same lock-reload-mutate-write discipline as the queue. On
//! any merge failure the worktree is preserved for manual intervention.

pub(crate) mod git;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use orbital_core::worktree::branch_for;
use orbital_core::{
    generate_worktree_name, merge_verdict, Error, Result, SessionId, WorktreeDescriptor,
    BRANCH_PREFIX,
};
use orbital_storage::{read_json, with_exclusive_lock, write_json, ProjectPaths};

use crate::executor::{AgentExecutor, ExecContext};
use git::{git_succeeds, run_git};

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorktreeState {
    worktrees: Vec<WorktreeDescriptor>,
}

/// Result of the merge phase.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub success: bool,
    pub cost_usd: f64,
}

/// Worktrees and branches with no matching descriptor, and descriptors
/// with no matching checkout.
#[derive(Debug, Default, PartialEq)]
pub struct OrphanReport {
    /// Descriptors whose checkout directory is gone.
    pub stale: Vec<WorktreeDescriptor>,
    /// `orbital/*` branches without a descriptor.
    pub orphan_branches: Vec<String>,
    /// Registered checkout directories without a descriptor.
    pub orphan_dirs: Vec<PathBuf>,
}

const MERGE_PROMPT: &str = "Merge the isolation branch '{branch}' back into \
'{original}'. Run: `git rebase {original} {branch}`, then `git checkout \
{original}`, then `git merge --ff-only {branch}`. If every command succeeds \
output 'MERGE_SUCCESS: true'. If anything fails (conflicts included), leave \
the repository as it stands and output 'MERGE_SUCCESS: false' with the \
reason.";

pub struct WorktreeManager {
    paths: ProjectPaths,
}

impl WorktreeManager {
    pub fn new(paths: ProjectPaths) -> Self {
        Self { paths }
    }

    fn project_dir(&self) -> &Path {
        self.paths.project_dir()
    }

    fn load_state(&self) -> Result<WorktreeState> {
        Ok(read_json::<WorktreeState>(&self.paths.worktree_state())?.unwrap_or_default())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut WorktreeState) -> Result<T>) -> Result<T> {
        with_exclusive_lock(&self.paths.worktree_lock(), || {
            let mut state = self.load_state()?;
            let result = f(&mut state)?;
            write_json(&self.paths.worktree_state(), &state)?;
            Ok(result)
        })
    }

    pub fn list(&self) -> Result<Vec<WorktreeDescriptor>> {
        Ok(self.load_state()?.worktrees)
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<WorktreeDescriptor>> {
        Ok(self.load_state()?.worktrees.into_iter().find(|w| w.name == name))
    }

    /// Drop the descriptor registered at `path`. Filesystem and branch
    /// are untouched; see [`WorktreeManager::cleanup`] for those.
    pub fn remove(&self, path: &Path) -> Result<()> {
        self.with_state(|state| {
            let before = state.worktrees.len();
            state.worktrees.retain(|w| w.path != path);
            if state.worktrees.len() == before {
                return Err(Error::NotFound(format!("worktree at {}", path.display())));
            }
            Ok(())
        })
    }

    /// Create an isolation branch and checkout for a session.
    pub async fn create(
        &self,
        spec_files: Vec<PathBuf>,
        session_id: SessionId,
    ) -> Result<WorktreeDescriptor> {
        let taken: Vec<String> =
            self.load_state()?.worktrees.into_iter().map(|w| w.name).collect();
        let name = generate_worktree_name(&taken);
        let branch = branch_for(&name);
        let path = self.paths.worktree_checkout(&name);

        let original_branch =
            run_git(self.project_dir(), &["rev-parse", "--abbrev-ref", "HEAD"]).await?;

        run_git(self.project_dir(), &["branch", &branch]).await?;
        let path_arg = path.display().to_string();
        if let Err(e) =
            run_git(self.project_dir(), &["worktree", "add", &path_arg, &branch]).await
        {
            // Roll back the branch so a retry can reuse the name space.
            let _ = run_git(self.project_dir(), &["branch", "-D", &branch]).await;
            return Err(e);
        }

        let descriptor = WorktreeDescriptor {
            name: name.clone(),
            path,
            branch,
            original_branch,
            created_at: chrono::Utc::now(),
            spec_files,
            session_id,
        };
        self.with_state(|state| {
            state.worktrees.push(descriptor.clone());
            Ok(())
        })?;
        info!(worktree = %name, "created isolation worktree");
        Ok(descriptor)
    }

    /// Run the agent-driven rebase-and-merge phase and verify it.
    ///
    /// `success: false` covers both an agent-reported failure and a
    /// failed post-merge verification; in both cases the worktree is
    /// left on disk.
    pub async fn merge(
        &self,
        descriptor: &WorktreeDescriptor,
        executor: &dyn AgentExecutor,
        model: &str,
        cancel: CancellationToken,
    ) -> Result<MergeOutcome> {
        let project = self.project_dir();
        run_git(project, &["rev-parse", "--verify", &descriptor.branch]).await?;
        run_git(project, &["rev-parse", "--verify", &descriptor.original_branch]).await?;
        let pre_merge_head = run_git(project, &["rev-parse", &descriptor.branch]).await?;

        let prompt = MERGE_PROMPT
            .replace("{branch}", &descriptor.branch)
            .replace("{original}", &descriptor.original_branch);
        let outcome = executor
            .execute(ExecContext {
                working_dir: project.to_path_buf(),
                prompt,
                model: model.to_string(),
                dangerously_skip_permissions: false,
                cancel,
                sink: None,
            })
            .await?;

        if merge_verdict(&outcome.output_text) != Some(true) {
            warn!(worktree = %descriptor.name, "merge agent reported failure");
            return Ok(MergeOutcome { success: false, cost_usd: outcome.cost_usd });
        }

        // The original branch must now contain the worktree's pre-merge
        // HEAD, or the merge did not actually land.
        let verified = git_succeeds(
            project,
            &["merge-base", "--is-ancestor", &pre_merge_head, &descriptor.original_branch],
        )
        .await;
        if !verified {
            warn!(worktree = %descriptor.name, "merge verification failed");
            return Ok(MergeOutcome { success: false, cost_usd: outcome.cost_usd });
        }

        match run_git(project, &["rev-parse", "--abbrev-ref", "HEAD"]).await {
            Ok(current) if current != descriptor.original_branch => {
                warn!(
                    current = %current,
                    expected = %descriptor.original_branch,
                    "checkout is not on the original branch after merge"
                );
            }
            Err(e) => warn!(error = %e, "could not inspect current branch"),
            _ => {}
        }

        Ok(MergeOutcome { success: true, cost_usd: outcome.cost_usd })
    }

    /// Remove the checkout directory and delete the branch.
    pub async fn cleanup(&self, descriptor: &WorktreeDescriptor) -> Result<()> {
        let project = self.project_dir();
        let path_arg = descriptor.path.display().to_string();
        if !git_succeeds(project, &["worktree", "remove", "--force", &path_arg]).await {
            warn!(worktree = %descriptor.name, "git worktree remove failed, deleting directory");
            let _ = std::fs::remove_dir_all(&descriptor.path);
            let _ = run_git(project, &["worktree", "prune"]).await;
        }
        if !git_succeeds(project, &["branch", "-d", &descriptor.branch]).await {
            run_git(project, &["branch", "-D", &descriptor.branch]).await?;
        }
        self.with_state(|state| {
            state.worktrees.retain(|w| w.name != descriptor.name);
            Ok(())
        })?;
        info!(worktree = %descriptor.name, "cleaned up worktree");
        Ok(())
    }

    /// Classify descriptors, branches, and checkout directories that
    /// have lost their counterpart.
    pub async fn orphans(&self) -> Result<OrphanReport> {
        let state = self.load_state()?;
        let mut report = OrphanReport::default();

        for descriptor in &state.worktrees {
            if !descriptor.path.exists() {
                report.stale.push(descriptor.clone());
            }
        }

        let pattern = format!("{}*", BRANCH_PREFIX);
        let branches = run_git(
            self.project_dir(),
            &["branch", "--list", &pattern, "--format=%(refname:short)"],
        )
        .await?;
        for branch in branches.lines().map(str::trim).filter(|b| !b.is_empty()) {
            if !state.worktrees.iter().any(|w| w.branch == branch) {
                report.orphan_branches.push(branch.to_string());
            }
        }

        if let Ok(entries) = std::fs::read_dir(self.paths.worktrees_dir()) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() && !state.worktrees.iter().any(|w| w.path == path) {
                    report.orphan_dirs.push(path);
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
