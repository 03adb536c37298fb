// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, signal handling, graceful shutdown.
//!
//! Startup order matters: the pid-file lock is taken first so a losing
//! daemon never touches the winner's socket or state files.

use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error as ThisError;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use orbital_core::Error;

use crate::config::{DaemonConfig, SHUTDOWN_TIMEOUT};
use crate::executor::ProcessExecutor;
use crate::registry::SessionRegistry;
use crate::runner::SessionRunner;
use crate::server::Server;
use crate::worktree::WorktreeManager;

#[derive(Debug, ThisError)]
pub enum LifecycleError {
    #[error("another daemon already holds {0}")]
    AlreadyRunning(PathBuf),

    #[error("bind {0} failed: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error(transparent)]
    Core(#[from] Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A started daemon, ready to serve.
pub struct Daemon {
    config: Arc<DaemonConfig>,
    registry: Arc<SessionRegistry>,
    runner: Arc<SessionRunner>,
    listener: Option<UnixListener>,
    shutdown: CancellationToken,
    // Held for the daemon's lifetime to keep the pid-file lock.
    _pid_lock: File,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon").finish_non_exhaustive()
    }
}

impl Daemon {
    /// Acquire the project, recover state, and bind the control plane.
    pub async fn startup(config: DaemonConfig) -> Result<Self, LifecycleError> {
        config.paths.ensure_dirs()?;

        // Lock first; never truncate before the lock is held, or a
        // losing daemon would wipe the winner's pid.
        let pid_path = config.paths.pid_file();
        let mut pid_lock = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&pid_path)?;
        pid_lock
            .try_lock_exclusive()
            .map_err(|_| LifecycleError::AlreadyRunning(pid_path.clone()))?;
        pid_lock.set_len(0)?;
        writeln!(pid_lock, "{}", std::process::id())?;

        let config = Arc::new(config);
        let registry = Arc::new(SessionRegistry::load(config.paths.daemon_state())?);
        let executor = Arc::new(ProcessExecutor::new(
            config.agent_command.clone(),
            config.max_output_size,
        ));
        let worktrees = Arc::new(WorktreeManager::new(config.paths.clone()));
        let runner = Arc::new(SessionRunner::new(
            Arc::clone(&config),
            Arc::clone(&registry),
            executor,
            worktrees,
        ));

        // A socket left by a dead daemon is unlinked at bind time; the
        // pid lock above proves no live daemon owns it.
        let socket_path = config.paths.socket();
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }
        let listener = UnixListener::bind(&socket_path)
            .map_err(|e| LifecycleError::BindFailed(socket_path.clone(), e))?;
        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o660))?;

        info!(
            project = %config.project_dir.display(),
            socket = %socket_path.display(),
            "daemon ready"
        );
        Ok(Self {
            config,
            registry,
            runner,
            listener: Some(listener),
            shutdown: CancellationToken::new(),
            _pid_lock: pid_lock,
        })
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn runner(&self) -> &Arc<SessionRunner> {
        &self.runner
    }

    /// Serve until a shutdown request or signal, then wind down:
    /// stop sessions, drain the listener, remove socket and pid file.
    pub async fn run(mut self) -> Result<(), LifecycleError> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| Error::Invalid("daemon already ran".into()))?;
        let server = Server::new(
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
            Arc::clone(&self.runner),
            self.shutdown.clone(),
        );
        let server_task = tokio::spawn(server.run(listener));

        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = self.shutdown.cancelled() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("SIGINT received");
                self.shutdown.cancel();
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received");
                self.shutdown.cancel();
            }
        }

        info!("shutting down");
        self.runner.stop_all(SHUTDOWN_TIMEOUT).await;
        if let Err(e) = server_task.await {
            warn!(error = %e, "server task ended abnormally");
        }

        let _ = std::fs::remove_file(self.config.paths.socket());
        let _ = std::fs::remove_file(self.config.paths.pid_file());
        info!("shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
