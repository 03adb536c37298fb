// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orbital stop [--force]`: stop running sessions; `--force` also
//! shuts the daemon down.

use std::path::Path;

use orbital_core::SessionStatus;

use crate::client::Client;
use crate::exit_error::ExitError;

pub async fn run(project_dir: &Path, force: bool) -> Result<(), ExitError> {
    let client = Client::new(project_dir);
    if !client.health().await {
        println!("daemon not running");
        return Ok(());
    }

    let sessions = client.list_sessions().await?;
    let mut stopped = 0;
    for session in &sessions.sessions {
        if matches!(session.status, SessionStatus::Running | SessionStatus::Merging) {
            client.stop_session(session.id.as_str()).await?;
            println!("stopping {}", session.id);
            stopped += 1;
        }
    }
    if stopped == 0 {
        println!("no running sessions");
    }

    if force {
        client.shutdown(true).await?;
        println!("daemon shutting down");
    }
    Ok(())
}
