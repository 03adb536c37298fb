// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI subcommand implementations.

pub mod daemon;
pub mod queue;
pub mod resume;
pub mod start;
pub mod status;
pub mod stop;
pub mod worktree;

use std::path::Path;
use std::time::Duration;

use orbital_core::{EventKind, OutputEvent};

use crate::client::Client;
use crate::exit_error::ExitError;

/// Connect to the daemon, spawning `orbitald` if none is listening.
pub(crate) async fn ensure_daemon(project_dir: &Path) -> Result<Client, ExitError> {
    let client = Client::new(project_dir);
    if client.health().await {
        return Ok(client);
    }

    let exe = std::env::var("ORBITAL_DAEMON_BIN").unwrap_or_else(|_| "orbitald".into());
    std::process::Command::new(&exe)
        .arg(project_dir)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ExitError::general(format!("failed to spawn {}: {}", exe, e)))?;

    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if client.health().await {
            return Ok(client);
        }
    }
    Err(ExitError::general("daemon did not come up"))
}

/// Render one output event for the terminal.
pub(crate) fn print_event(event: &OutputEvent) {
    match event.kind {
        EventKind::Text => println!("{}", event.payload),
        EventKind::Tool => println!("  [tool] {}", event.payload),
        EventKind::Status => eprintln!("-- {}", event.payload),
        EventKind::Error => eprintln!("!! {}", event.payload),
    }
}
