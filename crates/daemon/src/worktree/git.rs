// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin git subprocess wrapper.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use orbital_core::{Error, Result};

const GIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Run a git command in `cwd`; returns trimmed stdout.
///
/// Non-zero exit and timeouts surface as `ExternalTool` errors carrying
/// the command and stderr.
pub(crate) async fn run_git(cwd: &Path, args: &[&str]) -> Result<String> {
    let mut cmd = tokio::process::Command::new("git");
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(GIT_TIMEOUT, cmd.output())
        .await
        .map_err(|_| Error::ExternalTool(format!("git {} timed out", args.join(" "))))?
        .map_err(|e| Error::ExternalTool(format!("git {}: {}", args.join(" "), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::ExternalTool(format!(
            "git {} failed (exit {}): {}",
            args.join(" "),
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Like [`run_git`] but only reports success.
pub(crate) async fn git_succeeds(cwd: &Path, args: &[&str]) -> bool {
    run_git(cwd, args).await.is_ok()
}
