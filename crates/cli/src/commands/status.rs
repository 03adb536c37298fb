// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orbital status [--json]`.

use std::path::Path;

use orbital_daemon::discover_sessions;

use crate::client::Client;
use crate::exit_error::ExitError;

pub async fn run(project_dir: &Path, json: bool) -> Result<(), ExitError> {
    let client = Client::new(project_dir);
    if client.health().await {
        let status = client.status().await?;
        let sessions = client.list_sessions().await?;
        if json {
            let value = serde_json::json!({
                "daemon": status,
                "sessions": sessions.sessions,
            });
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
            return Ok(());
        }
        println!(
            "daemon pid {} up since {} (total cost ${:.2})",
            status.pid,
            status.started_at.format("%Y-%m-%d %H:%M:%S"),
            status.total_cost
        );
        for (state, count) in &status.sessions {
            println!("  {:<12} {}", state.to_string(), count);
        }
        for session in &sessions.sessions {
            println!(
                "  {}  {:<11} iter {:>2}  ${:.2}  {}",
                session.id,
                session.status.to_string(),
                session.iteration,
                session.total_cost_usd,
                session
                    .spec_files
                    .first()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            );
        }
        return Ok(());
    }

    // No daemon: fall back to offline discovery.
    let discovered = discover_sessions(project_dir)?;
    if json {
        let value: Vec<_> = discovered
            .iter()
            .map(|d| {
                serde_json::json!({
                    "session": d.session,
                    "valid": d.valid,
                    "reason": d.reason,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        return Ok(());
    }
    println!("daemon not running");
    if discovered.is_empty() {
        println!("no persisted sessions");
    }
    for d in discovered {
        match d.reason {
            Some(reason) => println!("  {}  {}  ({})", d.session.id, d.session.status, reason),
            None => println!("  {}  {}  (resumable)", d.session.id, d.session.status),
        }
    }
    Ok(())
}
