//! Defines the custom error types for the `core` module.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while unpacking an uploaded archive.
///
/// A closed enumeration so that HTTP status mapping is a plain `match`
/// instead of substring inspection of error messages.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The extraction lost the race against its deadline. The underlying
    /// work may still be running; cancellation is best-effort and any
    /// partial output is left for cleanup.
    #[error("archive extraction timed out after {0:?}")]
    Timeout(Duration),

    /// The archive library rejected the input (corrupt archive, unsupported
    /// format) or the extraction task failed outright.
    #[error("archive extraction failed: {0}")]
    Failed(String),
}

/// Errors produced while reading an extracted directory tree.
///
/// Per-file read failures are *not* represented here — they degrade into
/// inline placeholder segments. Failing to list a directory aborts the
/// whole read.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read directory {dir}: {source}")]
    DirUnreadable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
