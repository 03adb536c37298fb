// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic JSON file writes with backup and temp-file rename.
//!
//! Writes go to `<path>.tmp` and are renamed over `<path>`; the previous
//! contents are copied to `<path>.bak` first (best-effort). Reads fall
//! back to the backup when the primary is missing or fails to parse.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt state file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io { path: path.to_path_buf(), source }
    }
}

impl From<StoreError> for orbital_core::Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Io { source, .. } => orbital_core::Error::Io(source),
            StoreError::Corrupt { path, reason } => orbital_core::Error::Io(
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("corrupt state file {}: {}", path.display(), reason),
                ),
            ),
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".tmp");
    PathBuf::from(p)
}

fn bak_path(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".bak");
    PathBuf::from(p)
}

/// Write `bytes` to `path` atomically.
///
/// A failure on the primary write is a hard error; the backup copy is
/// best-effort.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(path, e))?;
    }

    if path.exists() {
        if let Err(e) = std::fs::copy(path, bak_path(path)) {
            warn!(path = %path.display(), error = %e, "backup copy failed");
        }
    }

    let tmp = tmp_path(path);
    std::fs::write(&tmp, bytes).map_err(|e| StoreError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

/// Read `path`, falling back to `<path>.bak` when the primary is missing.
///
/// Returns `Ok(None)` when neither file exists.
pub fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let bak = bak_path(path);
            match std::fs::read(&bak) {
                Ok(bytes) => {
                    warn!(path = %path.display(), "primary missing, loaded backup");
                    Ok(Some(bytes))
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(StoreError::io(&bak, e)),
            }
        }
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Read and parse `path` as JSON, attempting `<path>.bak` when the
/// primary is missing or does not parse.
///
/// Returns `Ok(None)` when neither file exists.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let primary = match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(StoreError::io(path, e)),
    };

    let primary_err = match primary {
        Some(bytes) => match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => return Ok(Some(value)),
            Err(e) => Some(e.to_string()),
        },
        None => None,
    };

    let bak = bak_path(path);
    let bak_bytes = match std::fs::read(&bak) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return match primary_err {
                Some(reason) => Err(StoreError::Corrupt { path: path.to_path_buf(), reason }),
                None => Ok(None),
            };
        }
        Err(e) => return Err(StoreError::io(&bak, e)),
    };

    match serde_json::from_slice::<T>(&bak_bytes) {
        Ok(value) => {
            warn!(path = %path.display(), "primary unreadable, loaded backup");
            Ok(Some(value))
        }
        Err(e) => Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: primary_err.unwrap_or_else(|| e.to_string()),
        }),
    }
}

/// Serialize `value` and write it atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    atomic_write(path, &bytes)
}

/// Remove an orphaned `<path>.tmp` left behind by a crash mid-write.
pub fn clean_orphan_tmp(path: &Path) {
    let tmp = tmp_path(path);
    if tmp.exists() {
        debug!(path = %tmp.display(), "removing orphaned tmp file");
        let _ = std::fs::remove_file(&tmp);
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
