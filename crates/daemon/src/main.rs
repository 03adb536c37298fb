// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! orbitald: the Orbital session daemon.
//!
//! Usage: `orbitald [project-dir]`. Serves one project; state, socket,
//! and logs live under `<project>/.orbital/`.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use orbital_daemon::config::DaemonConfig;
use orbital_daemon::lifecycle::Daemon;

fn init_tracing(config: &DaemonConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_env("ORBITAL_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let log_path = config.paths.daemon_log();
    match log_path.parent().map(std::fs::create_dir_all) {
        Some(Ok(())) => {
            let appender = tracing_appender::rolling::never(
                log_path.parent().unwrap_or_else(|| std::path::Path::new(".")),
                "daemon.log",
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            tracing_subscriber::registry().with(stderr_layer).with(file_layer).init();
            Some(guard)
        }
        _ => {
            tracing_subscriber::registry().with(stderr_layer).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let project_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok());
    let Some(project_dir) = project_dir else {
        eprintln!("orbitald: cannot determine project directory");
        return ExitCode::from(4);
    };

    let config = DaemonConfig::new(project_dir);
    let _log_guard = init_tracing(&config);

    let daemon = match Daemon::startup(config).await {
        Ok(daemon) => daemon,
        Err(e) => {
            eprintln!("orbitald: {}", e);
            return ExitCode::from(4);
        }
    };

    match daemon.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("orbitald: {}", e);
            ExitCode::from(4)
        }
    }
}
