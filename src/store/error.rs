//! Store error types.

use std::path::PathBuf;

/// Errors that can occur in the persistent session store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Failed to create the database directory.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open the database file.
    #[error("Failed to open database {path}: {source}")]
    DatabaseOpen {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// Database operation failed.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON column serialization failed.
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Background task was cancelled.
    #[error("Database task cancelled")]
    TaskCancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_dir_display() {
        let err = StoreError::CreateDir {
            path: PathBuf::from("/tmp/x"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/tmp/x"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let err: StoreError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, StoreError::Sqlite(_)));
        assert!(err.to_string().contains("Database error"));
    }

    #[test]
    fn test_task_cancelled_display() {
        assert_eq!(
            StoreError::TaskCancelled.to_string(),
            "Database task cancelled"
        );
    }
}
