// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orbital worktree {list|show|remove|cleanup}`.
//!
//! Worktree state is a project file; these commands drive the manager
//! directly and work whether or not a daemon is up.

use clap::Subcommand;
use std::path::Path;

use orbital_daemon::worktree::WorktreeManager;
use orbital_storage::ProjectPaths;

use crate::exit_error::ExitError;

#[derive(Subcommand)]
pub enum WorktreeCommand {
    /// List tracked worktrees
    List,
    /// Show one worktree
    Show { name: String },
    /// Remove a worktree: delete its checkout and branch
    Remove { name: String },
    /// Clean up stale descriptors and orphaned branches/directories
    Cleanup,
}

pub async fn run(project_dir: &Path, command: WorktreeCommand) -> Result<(), ExitError> {
    let manager = WorktreeManager::new(ProjectPaths::new(project_dir));

    match command {
        WorktreeCommand::List => {
            let worktrees = manager.list()?;
            if worktrees.is_empty() {
                println!("no worktrees");
            }
            for wt in worktrees {
                println!(
                    "{:<24} {}  session {}  {}",
                    wt.name,
                    wt.branch,
                    wt.session_id,
                    wt.path.display()
                );
            }
        }
        WorktreeCommand::Show { name } => {
            let descriptor = manager
                .find_by_name(&name)?
                .ok_or_else(|| ExitError::general(format!("no worktree named {:?}", name)))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&descriptor).unwrap_or_default()
            );
        }
        WorktreeCommand::Remove { name } => {
            let descriptor = manager
                .find_by_name(&name)?
                .ok_or_else(|| ExitError::general(format!("no worktree named {:?}", name)))?;
            manager.cleanup(&descriptor).await?;
            println!("removed {}", name);
        }
        WorktreeCommand::Cleanup => {
            let report = manager.orphans().await?;
            for stale in &report.stale {
                manager.remove(&stale.path)?;
                println!("dropped stale descriptor {}", stale.name);
            }
            for branch in &report.orphan_branches {
                println!("orphan branch {} (delete with `git branch -D {}`)", branch, branch);
            }
            for dir in &report.orphan_dirs {
                println!("orphan directory {}", dir.display());
            }
            if report.stale.is_empty()
                && report.orphan_branches.is_empty()
                && report.orphan_dirs.is_empty()
            {
                println!("nothing to clean up");
            }
        }
    }
    Ok(())
}
