// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orbital queue {add|list|clear}`.
//!
//! The queue is a project file guarded by a cross-process lock, so the
//! CLI mutates it directly; no daemon is needed.

use clap::Subcommand;
use std::path::{Path, PathBuf};

use orbital_storage::{ProjectPaths, SpecQueue};

use crate::exit_error::ExitError;

#[derive(Subcommand)]
pub enum QueueCommand {
    /// Add specification files to the queue
    Add { specs: Vec<PathBuf> },
    /// Show queued specification files
    List,
    /// Drain the queue
    Clear,
}

pub fn run(project_dir: &Path, command: QueueCommand) -> Result<(), ExitError> {
    let paths = ProjectPaths::new(project_dir);
    paths.ensure_dirs().map_err(|e| ExitError::general(e.to_string()))?;
    let mut queue = SpecQueue::open(&paths)?;

    match command {
        QueueCommand::Add { specs } => {
            if specs.is_empty() {
                return Err(ExitError::general("no specs given"));
            }
            for spec in specs {
                let spec = if spec.is_absolute() { spec } else { project_dir.join(spec) };
                if queue.add(spec.clone())? {
                    println!("queued {}", spec.display());
                } else {
                    println!("already queued {}", spec.display());
                }
            }
        }
        QueueCommand::List => {
            if queue.is_empty() {
                println!("queue is empty");
            }
            for entry in queue.entries() {
                println!(
                    "{}  {}",
                    entry.queued_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.path.display()
                );
            }
        }
        QueueCommand::Clear => {
            let drained = queue.pop_all()?;
            println!("cleared {} entries", drained.len());
        }
    }
    Ok(())
}
