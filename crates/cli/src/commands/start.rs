// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orbital <spec...>`: start a session and follow its output.

use std::path::{Path, PathBuf};

use orbital_daemon::protocol::StartSessionRequest;
use orbital_storage::{ProjectPaths, SpecQueue};

use super::{ensure_daemon, print_event};
use crate::exit_error::{exit_code_for_session, ExitError};

pub struct StartArgs {
    pub spec_files: Vec<PathBuf>,
    pub worktree: bool,
    pub budget: Option<f64>,
    pub iterations: Option<u32>,
    pub timeout: Option<u64>,
    pub model: Option<String>,
    pub dangerous: bool,
    pub queue: bool,
}

pub async fn run(project_dir: &Path, args: StartArgs) -> Result<(), ExitError> {
    if args.spec_files.is_empty() {
        return Err(ExitError::general(
            "no specification files given (try `orbital spec.md` or `orbital --help`)",
        ));
    }
    let spec_files: Vec<PathBuf> = args
        .spec_files
        .iter()
        .map(|p| if p.is_absolute() { p.clone() } else { project_dir.join(p) })
        .collect();
    for spec in &spec_files {
        if !spec.exists() {
            return Err(ExitError::general(format!("spec not found: {}", spec.display())));
        }
    }

    if args.queue {
        let paths = ProjectPaths::new(project_dir);
        paths.ensure_dirs().map_err(|e| ExitError::general(e.to_string()))?;
        let mut queue = SpecQueue::open(&paths)?;
        for spec in &spec_files {
            if queue.add(spec.clone())? {
                println!("queued {}", spec.display());
            } else {
                println!("already queued {}", spec.display());
            }
        }
        return Ok(());
    }

    let client = ensure_daemon(project_dir).await?;
    let session = client
        .start_session(&StartSessionRequest {
            spec_files,
            worktree: args.worktree,
            max_budget_usd: args.budget,
            max_iterations: args.iterations,
            iteration_timeout_secs: args.timeout,
            model: args.model,
            dangerously_skip_permissions: args.dangerous,
            ..Default::default()
        })
        .await?;
    eprintln!("session {} started", session.id);

    client.stream_output(session.id.as_str(), print_event).await?;

    let done = client.get_session(session.id.as_str()).await?;
    eprintln!(
        "session {} {} (iteration {}, ${:.2})",
        done.id, done.status, done.iteration, done.total_cost_usd
    );
    let code = exit_code_for_session(&done);
    if code == 0 {
        Ok(())
    } else {
        Err(ExitError::new(code, done.error.unwrap_or_else(|| done.status.to_string())))
    }
}
