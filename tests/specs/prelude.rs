// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the workspace specs.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub use orbital_core::{Session, SessionBuilder, SessionStatus};
pub use orbital_daemon::config::DaemonConfig;
pub use orbital_daemon::executor::ProcessExecutor;
pub use orbital_daemon::registry::SessionRegistry;
pub use orbital_daemon::runner::SessionRunner;
pub use orbital_daemon::worktree::WorktreeManager;
pub use orbital_storage::ProjectPaths;

/// A temp project wired to a stub agent script.
pub struct Project {
    pub temp: tempfile::TempDir,
    pub runner: Arc<SessionRunner>,
    pub registry: Arc<SessionRegistry>,
}

impl Project {
    /// Build a project whose agent is `#!/bin/sh` followed by `script`.
    pub fn with_agent(script: &str) -> Self {
        Self::with_agent_and_capacity(script, 3)
    }

    pub fn with_agent_and_capacity(script: &str, capacity: usize) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let agent = write_agent_script(temp.path(), script);

        let mut config = DaemonConfig::new(temp.path());
        config.agent_command = agent;
        config.max_concurrent_sessions = capacity;
        config.paths.ensure_dirs().unwrap();
        let config = Arc::new(config);

        let registry =
            Arc::new(SessionRegistry::load(config.paths.daemon_state()).unwrap());
        let executor = Arc::new(ProcessExecutor::new(
            config.agent_command.clone(),
            config.max_output_size,
        ));
        let worktrees = Arc::new(WorktreeManager::new(ProjectPaths::new(temp.path())));
        let runner = Arc::new(SessionRunner::new(
            config,
            Arc::clone(&registry),
            executor,
            worktrees,
        ));
        Self { temp, runner, registry }
    }

    pub fn spec_request(&self) -> orbital_daemon::protocol::StartSessionRequest {
        orbital_daemon::protocol::StartSessionRequest {
            spec_files: vec![self.temp.path().join("spec.md")],
            ..Default::default()
        }
    }

    pub async fn wait_terminal(&self, id: &str) -> Session {
        for _ in 0..600 {
            if let Some(session) = self.registry.get(id) {
                if session.is_terminal() {
                    return session;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session {} never reached a terminal status", id);
    }
}

/// Write an executable stub agent under `dir` and return its path.
pub fn write_agent_script(dir: &Path, body: &str) -> String {
    let path = dir.join("stub-agent.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path.display().to_string()
}

/// Load the persisted registry envelope for direct inspection.
pub fn read_state_file(dir: &Path) -> serde_json::Value {
    let path = ProjectPaths::new(dir).daemon_state();
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}
