//! Per-file read offset bookkeeping.
//!
//! Tracks the last committed size and modification time for every source
//! file so each poll reads only newly appended bytes. Offsets advance only
//! through [`OffsetTracker::commit`], which the scheduler calls after a
//! full line batch has been processed.

use std::collections::HashMap;

/// Last committed size and mtime of one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSignature {
    /// File size in bytes.
    pub size: u64,
    /// Modification time in milliseconds since the epoch.
    pub mtime_ms: i64,
}

impl FileSignature {
    #[must_use]
    pub fn new(size: u64, mtime_ms: i64) -> Self {
        Self { size, mtime_ms }
    }
}

/// Tracks read offsets for all watched session files.
#[derive(Debug, Default)]
pub struct OffsetTracker {
    files: HashMap<String, FileSignature>,
}

impl OffsetTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a file needs reading and from which byte.
    ///
    /// Returns `Some(0)` for a file seen for the first time, or when the
    /// file shrank (truncation/rotation — treated as a new logical file,
    /// re-read in full and absorbed by idempotent merge downstream).
    /// Returns `Some(previous_size)` when size or mtime changed, and
    /// `None` when there is nothing new.
    #[must_use]
    pub fn should_process(&self, file_id: &str, current: FileSignature) -> Option<u64> {
        match self.files.get(file_id) {
            None => Some(0),
            Some(prev) if current.size < prev.size => Some(0),
            Some(prev) if *prev != current => Some(prev.size),
            Some(_) => None,
        }
    }

    /// Commit the signature observed before a successful read.
    pub fn commit(&mut self, file_id: &str, signature: FileSignature) {
        self.files.insert(file_id.to_string(), signature);
    }

    /// Last committed signature for a file, if any.
    #[must_use]
    pub fn get(&self, file_id: &str) -> Option<FileSignature> {
        self.files.get(file_id).copied()
    }

    /// Number of tracked files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
