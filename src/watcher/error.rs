//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while tailing session files.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// Sessions directory does not exist.
    #[error("Sessions directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// Permission denied accessing a file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// A stop signal was observed mid-batch; the offset was not committed.
    #[error("Cancelled mid-batch")]
    Cancelled,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
