// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared across component boundaries.
//!
//! The session runner is the single translator from these kinds into
//! terminal session statuses and CLI exit codes.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Which configured limit a session ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    MaxIterations,
    Budget,
    Deadline,
}

impl LimitKind {
    /// Stable prefix used in persisted `error` strings so clients can
    /// recover the limit kind from a session record.
    pub fn error_prefix(&self) -> &'static str {
        match self {
            LimitKind::MaxIterations => "max iterations reached",
            LimitKind::Budget => "budget exceeded",
            LimitKind::Deadline => "deadline exceeded",
        }
    }

    /// Process exit code for the CLI when a session ends on this limit.
    pub fn exit_code(&self) -> i32 {
        match self {
            LimitKind::MaxIterations => 1,
            LimitKind::Budget => 2,
            LimitKind::Deadline => 3,
        }
    }
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.error_prefix())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid: {0}")]
    Invalid(String),

    #[error("{0}")]
    LimitExceeded(LimitKind),

    #[error("cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external tool failed: {0}")]
    ExternalTool(String),
}

impl Error {
    /// Process exit code for the CLI exit-code table.
    ///
    /// 0 success; 1 max-iterations; 2 budget; 3 deadline; 4 general
    /// failure; 130 interrupted.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::LimitExceeded(kind) => kind.exit_code(),
            Error::Cancelled => 130,
            _ => 4,
        }
    }

    /// Recover the exit code class from a persisted session error string.
    ///
    /// Terminal records carry only a human-readable `error` string; limit
    /// errors are written with a stable prefix (see
    /// [`LimitKind::error_prefix`]).
    pub fn exit_code_for_error_text(text: &str) -> i32 {
        for kind in [LimitKind::MaxIterations, LimitKind::Budget, LimitKind::Deadline] {
            if text.starts_with(kind.error_prefix()) {
                return kind.exit_code();
            }
        }
        4
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
