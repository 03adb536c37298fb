// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orbital daemon {start|stop|status}`.

use clap::Subcommand;
use std::path::Path;

use super::ensure_daemon;
use crate::client::Client;
use crate::exit_error::ExitError;

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the project daemon if it is not running
    Start,
    /// Ask the daemon to shut down
    Stop {
        /// Shut down even with running sessions
        #[arg(long)]
        force: bool,
    },
    /// Check whether the daemon is up
    Status,
}

pub async fn run(project_dir: &Path, command: DaemonCommand) -> Result<(), ExitError> {
    match command {
        DaemonCommand::Start => {
            let client = ensure_daemon(project_dir).await?;
            let status = client.status().await?;
            println!("daemon running (pid {})", status.pid);
            Ok(())
        }
        DaemonCommand::Stop { force } => {
            let client = Client::new(project_dir);
            if !client.health().await {
                println!("daemon not running");
                return Ok(());
            }
            let response = client.shutdown(force).await?;
            println!("{}", response.status);
            Ok(())
        }
        DaemonCommand::Status => {
            let client = Client::new(project_dir);
            if client.health().await {
                let status = client.status().await?;
                println!("daemon running (pid {})", status.pid);
            } else {
                println!("daemon not running");
            }
            Ok(())
        }
    }
}
