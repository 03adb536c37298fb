// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orbital continue`: resume the project's resumable session.

use std::path::Path;

use orbital_daemon::discover_sessions;

use super::{ensure_daemon, print_event};
use crate::exit_error::{exit_code_for_session, ExitError};

pub async fn run(project_dir: &Path) -> Result<(), ExitError> {
    // Discovery is offline: it tells the user about stale records even
    // when no daemon is up yet.
    let discovered = discover_sessions(project_dir)?;
    let candidates: Vec<_> = discovered.iter().filter(|d| d.valid).collect();

    for invalid in discovered.iter().filter(|d| !d.valid) {
        eprintln!(
            "skipping session {}: {}",
            invalid.session.id,
            invalid.reason.as_deref().unwrap_or("not resumable")
        );
    }

    let candidate = match candidates.as_slice() {
        [] => return Err(ExitError::general("no resumable session found")),
        [single] => single,
        many => {
            eprintln!("multiple resumable sessions:");
            for d in many {
                eprintln!(
                    "  {}  {}  iteration {}",
                    d.session.id, d.session.status, d.session.iteration
                );
            }
            return Err(ExitError::general(
                "multiple resumable sessions; connect with `orbital status` and pick one",
            ));
        }
    };

    let client = ensure_daemon(project_dir).await?;
    let session = client.resume_session(candidate.session.id.as_str()).await?;
    eprintln!("session {} resumed at iteration {}", session.id, session.iteration);

    client.stream_output(session.id.as_str(), print_event).await?;

    let done = client.get_session(session.id.as_str()).await?;
    eprintln!("session {} {}", done.id, done.status);
    let code = exit_code_for_session(&done);
    if code == 0 {
        Ok(())
    } else {
        Err(ExitError::new(code, done.error.unwrap_or_else(|| done.status.to_string())))
    }
}
