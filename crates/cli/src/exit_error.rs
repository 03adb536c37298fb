// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use std::fmt;

use orbital_core::{Session, SessionStatus};

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<crate::client::ClientError> for ExitError {
    fn from(e: crate::client::ClientError) -> Self {
        Self::general(e.to_string())
    }
}

impl From<orbital_core::Error> for ExitError {
    fn from(e: orbital_core::Error) -> Self {
        Self::new(e.exit_code(), e.to_string())
    }
}

/// Map a terminal session onto the exit-code table: 0 success, 1
/// max-iterations, 2 budget, 3 deadline, 4 general failure, 130
/// interrupted.
pub fn exit_code_for_session(session: &Session) -> i32 {
    match session.status {
        SessionStatus::Completed | SessionStatus::Merged => 0,
        SessionStatus::Stopped | SessionStatus::Interrupted => 130,
        SessionStatus::Failed => session
            .error
            .as_deref()
            .map(orbital_core::Error::exit_code_for_error_text)
            .unwrap_or(4),
        SessionStatus::Conflict => 4,
        SessionStatus::Pending | SessionStatus::Running | SessionStatus::Merging => 0,
    }
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
