//! Best-effort removal of request-scoped scratch storage.
//!
//! Both helpers are idempotent (an absent path is a no-op) and never fail
//! the caller: individual removal errors are logged and swallowed. Handlers
//! run these on every exit path after acquiring scratch files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Removes each listed scratch file, logging failures without raising.
pub async fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!("failed to remove scratch file {}: {}", path.display(), err);
            }
        }
    }
}

/// Recursively removes a scratch directory, logging failures without raising.
pub async fn remove_dir(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!("failed to remove scratch dir {}: {}", path.display(), err);
        }
    }
}
