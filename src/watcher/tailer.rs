//! Byte-range line reader for session files.
//!
//! Reads exactly the bytes the offset tracker flagged as new, so repeated
//! polls never re-process or skip data even while the file keeps growing
//! mid-read.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};

use super::error::WatcherError;

/// Read the non-blank lines in the byte range `[from, to)` of a file.
///
/// The read is bounded at `to` (the size observed when the file was
/// statted) so bytes appended during the read are left for the next poll.
/// Blank lines are dropped; line content is returned raw for the caller
/// to parse.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read; the caller
/// skips the offset commit so the next tick retries.
pub async fn read_lines(path: &Path, from: u64, to: u64) -> Result<Vec<String>, WatcherError> {
    if to <= from {
        return Ok(Vec::new());
    }

    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(WatcherError::PermissionDenied(path.to_path_buf()));
        }
        Err(e) => return Err(WatcherError::Io(e)),
    };

    file.seek(std::io::SeekFrom::Start(from)).await?;
    let mut reader = BufReader::new(file.take(to - from));

    let mut lines = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }

    Ok(lines)
}

/// Parse one raw line as JSON.
///
/// Partial writes produce unparseable lines at the tail of a file; those
/// return `None` and the caller counts them.
#[must_use]
pub fn parse_line(line: &str) -> Option<serde_json::Value> {
    serde_json::from_str(line).ok()
}
