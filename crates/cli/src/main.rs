// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! orbital: CLI front-end for the Orbital session daemon.

mod client;
mod commands;
mod exit_error;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use exit_error::ExitError;

#[derive(Parser)]
#[command(
    name = "orbital",
    about = "Supervise AI coding agents against specification files",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Specification files to drive a session against
    #[arg(value_name = "SPEC")]
    spec_files: Vec<PathBuf>,

    /// Isolate the session in a git worktree
    #[arg(long)]
    worktree: bool,

    /// Maximum budget in USD
    #[arg(long)]
    budget: Option<f64>,

    /// Maximum workflow iterations
    #[arg(long)]
    iterations: Option<u32>,

    /// Per-iteration timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Agent model override
    #[arg(long)]
    model: Option<String>,

    /// Let the agent skip permission prompts
    #[arg(long)]
    dangerous: bool,

    /// Queue the specs instead of starting immediately
    #[arg(long)]
    queue: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resume the resumable session for this project
    Continue,
    /// Show daemon and session status
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Stop running sessions (and the daemon with --force)
    Stop {
        #[arg(long)]
        force: bool,
    },
    /// Manage the spec queue
    Queue {
        #[command(subcommand)]
        command: commands::queue::QueueCommand,
    },
    /// Manage isolation worktrees
    Worktree {
        #[command(subcommand)]
        command: commands::worktree::WorktreeCommand,
    },
    /// Control the project daemon
    Daemon {
        #[command(subcommand)]
        command: commands::daemon::DaemonCommand,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let project_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("orbital: cannot determine working directory: {}", e);
            return ExitCode::from(4);
        }
    };

    let result = match cli.command {
        Some(Commands::Continue) => commands::resume::run(&project_dir).await,
        Some(Commands::Status { json }) => commands::status::run(&project_dir, json).await,
        Some(Commands::Stop { force }) => commands::stop::run(&project_dir, force).await,
        Some(Commands::Queue { command }) => commands::queue::run(&project_dir, command),
        Some(Commands::Worktree { command }) => {
            commands::worktree::run(&project_dir, command).await
        }
        Some(Commands::Daemon { command }) => commands::daemon::run(&project_dir, command).await,
        None => {
            commands::start::run(
                &project_dir,
                commands::start::StartArgs {
                    spec_files: cli.spec_files,
                    worktree: cli.worktree,
                    budget: cli.budget,
                    iterations: cli.iterations,
                    timeout: cli.timeout,
                    model: cli.model,
                    dangerous: cli.dangerous,
                    queue: cli.queue,
                },
            )
            .await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(ExitError { code, message }) => {
            if !message.is_empty() {
                eprintln!("orbital: {}", message);
            }
            ExitCode::from(code.clamp(0, 255) as u8)
        }
    }
}
