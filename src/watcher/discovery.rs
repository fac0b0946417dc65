//! Session file discovery.
//!
//! Locates OpenClaw session log files on disk and derives session ids
//! from file names.

use std::path::{Path, PathBuf};

use super::error::WatcherError;

/// Default sessions directory for the main OpenClaw agent.
///
/// Sessions are written to `~/.openclaw/agents/main/sessions/<id>.jsonl`.
#[must_use]
pub fn default_sessions_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".openclaw")
        .join("agents")
        .join("main")
        .join("sessions")
}

/// Whether a file name looks like a live session log.
///
/// Lock files and tombstoned (`.deleted.`) files are excluded.
#[must_use]
pub fn is_session_file(file_name: &str) -> bool {
    file_name.ends_with(".jsonl")
        && !file_name.ends_with(".lock")
        && !file_name.contains(".deleted.")
}

/// Derive the session id from a session file name.
///
/// The id is the file stem: `abc123.jsonl` → `abc123`.
#[must_use]
pub fn session_id_for(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(".jsonl")?;
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// List candidate session files in a directory as (session id, path).
///
/// # Errors
///
/// Returns an error if the directory cannot be read (including when it
/// does not exist yet).
pub fn list_session_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, WatcherError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WatcherError::DirectoryNotFound(dir.to_path_buf())
        } else {
            WatcherError::Io(e)
        }
    })?;

    let mut files = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_session_file(file_name) {
            continue;
        }
        if let Some(session_id) = session_id_for(file_name) {
            files.push((session_id, path));
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_session_file() {
        assert!(is_session_file("abc123.jsonl"));
        assert!(!is_session_file("abc123.jsonl.lock"));
        assert!(!is_session_file("abc123.deleted.jsonl"));
        assert!(!is_session_file("notes.txt"));
        assert!(!is_session_file("abc123.json"));
    }

    #[test]
    fn test_session_id_for() {
        assert_eq!(session_id_for("abc123.jsonl"), Some("abc123".to_string()));
        assert_eq!(session_id_for(".jsonl"), None);
        assert_eq!(session_id_for("abc123.txt"), None);
    }

    #[test]
    fn test_list_session_files_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in [
            "bbb.jsonl",
            "aaa.jsonl",
            "aaa.jsonl.lock",
            "old.deleted.jsonl",
            "readme.md",
        ] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let files = list_session_files(dir.path()).unwrap();

        let ids: Vec<&str> = files.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["aaa", "bbb"]);
    }

    #[test]
    fn test_list_missing_directory_is_an_error() {
        let result = list_session_files(Path::new("/tmp/no-such-dir-558821"));
        assert!(matches!(result, Err(WatcherError::DirectoryNotFound(_))));
    }
}
