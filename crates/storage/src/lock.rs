// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory whole-file exclusive locks.
//!
//! fs2 maps to flock on POSIX and LockFileEx on Windows; the contract
//! exposed here is identical on both.

use fs2::FileExt;
use std::fs::File;
use std::path::Path;

use crate::store::StoreError;

struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Run `f` while holding an exclusive lock on `lock_path`.
///
/// The lock file is created if absent. The lock is released on every
/// exit path, including panics and early returns from `f`.
pub fn with_exclusive_lock<T, E>(
    lock_path: &Path,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<StoreError>,
{
    let io = |e| E::from(StoreError::Io { path: lock_path.to_path_buf(), source: e });
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .map_err(io)?;
    file.lock_exclusive().map_err(io)?;
    let _guard = LockGuard { file };
    f()
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
