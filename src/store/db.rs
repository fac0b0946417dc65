//! Persistent session store backed by `SQLite`.
//!
//! All calls are async via `spawn_blocking`; the in-memory aggregator
//! remains authoritative and treats this store as a write-behind cache
//! plus a source of history at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;

use super::error::StoreError;
use super::schema::SCHEMA;
use super::types::{SessionPatch, ToolCallPatch};
use crate::model::{Session, SessionStatus, SessionSummary, ToolCall, ToolStatus};

/// Returns the default path for the bridge database.
///
/// This is `~/.local/share/openclaw-bridge/bridge.db` on Unix systems.
#[must_use]
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("openclaw-bridge")
        .join("bridge.db")
}

/// Durable store for sessions and tool calls.
#[derive(Debug, Clone)]
pub struct SessionStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Open a store at the specified path.
    ///
    /// Creates parent directories if they don't exist and initializes the
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be applied.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|source| {
                    StoreError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    }
                })?;
            }
        }

        let path_clone = path.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            let conn =
                Connection::open(&path_clone).map_err(|source| StoreError::DatabaseOpen {
                    path: path_clone,
                    source,
                })?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Open an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or the schema
    /// cannot be applied.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = tokio::task::spawn_blocking(|| -> Result<Connection, StoreError> {
            let conn = Connection::open_in_memory()?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Returns the path to the database, if opened from a file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert or replace a session row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    pub async fn upsert_session(&self, session: &Session) -> Result<(), StoreError> {
        let id = session.id.clone();
        let name = session.name.clone();
        let status = session.status.as_str();
        let start_time = session.start_time.timestamp_millis();
        let end_time = session.end_time.map(|t| t.timestamp_millis());
        let total_tokens_in = clamp_u64(session.total_tokens_in);
        let total_tokens_out = clamp_u64(session.total_tokens_out);
        let estimated_cost = session.estimated_cost;
        let channel = session.channel.clone();
        let user_id = session.user_id.clone();
        let agent_id = session.agent_id.clone();

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT OR REPLACE INTO sessions (id, name, status, start_time, end_time,
                    total_tokens_in, total_tokens_out, estimated_cost, channel, user_id, agent_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    id,
                    name,
                    status,
                    start_time,
                    end_time,
                    total_tokens_in,
                    total_tokens_out,
                    estimated_cost,
                    channel,
                    user_id,
                    agent_id
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }

    /// Update individual fields of a session row.
    ///
    /// An empty patch is a no-op; a missing row is left missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn update_session_fields(
        &self,
        id: &str,
        patch: &SessionPatch,
    ) -> Result<(), StoreError> {
        let mut fields: Vec<&'static str> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if let Some(name) = &patch.name {
            fields.push("name = ?");
            values.push(SqlValue::Text(name.clone()));
        }
        if let Some(status) = patch.status {
            fields.push("status = ?");
            values.push(SqlValue::Text(status.as_str().to_string()));
        }
        if let Some(end_time) = patch.end_time {
            fields.push("end_time = ?");
            values.push(SqlValue::Integer(end_time.timestamp_millis()));
        }
        if let Some(tokens) = patch.total_tokens_in {
            fields.push("total_tokens_in = ?");
            values.push(SqlValue::Integer(clamp_u64(tokens)));
        }
        if let Some(tokens) = patch.total_tokens_out {
            fields.push("total_tokens_out = ?");
            values.push(SqlValue::Integer(clamp_u64(tokens)));
        }
        if let Some(cost) = patch.estimated_cost {
            fields.push("estimated_cost = ?");
            values.push(SqlValue::Real(cost));
        }

        if fields.is_empty() {
            return Ok(());
        }

        let sql = format!("UPDATE sessions SET {} WHERE id = ?", fields.join(", "));
        values.push(SqlValue::Text(id.to_string()));

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.blocking_lock();
            conn.execute(&sql, rusqlite::params_from_iter(values))?;
            Ok(())
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }

    /// Insert or replace a tool-call row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written or a JSON column
    /// cannot be serialized.
    pub async fn upsert_tool_call(
        &self,
        session_id: &str,
        call: &ToolCall,
    ) -> Result<(), StoreError> {
        let id = call.id.clone();
        let session_id = session_id.to_string();
        let tool_name = call.tool_name.clone();
        let parameters = serde_json::to_string(&call.parameters)?;
        let result = call
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let error = call.error.clone();
        let status = call.status.as_str();
        let start_time = call.start_time.timestamp_millis();
        let end_time = call.end_time.map(|t| t.timestamp_millis());
        let duration_ms = call.duration_ms;
        let tokens_in = call.tokens_in.map(clamp_u64);
        let tokens_out = call.tokens_out.map(clamp_u64);
        let parent_id = call.parent_id.clone();

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT OR REPLACE INTO tool_calls
                    (id, session_id, tool_name, parameters, result, error, status,
                     start_time, end_time, duration_ms, tokens_in, tokens_out, parent_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    id,
                    session_id,
                    tool_name,
                    parameters,
                    result,
                    error,
                    status,
                    start_time,
                    end_time,
                    duration_ms,
                    tokens_in,
                    tokens_out,
                    parent_id
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }

    /// Update individual fields of a tool-call row.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn update_tool_call_fields(
        &self,
        id: &str,
        session_id: &str,
        patch: &ToolCallPatch,
    ) -> Result<(), StoreError> {
        let mut fields: Vec<&'static str> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if let Some(status) = patch.status {
            fields.push("status = ?");
            values.push(SqlValue::Text(status.as_str().to_string()));
        }
        if let Some(result) = &patch.result {
            fields.push("result = ?");
            values.push(SqlValue::Text(serde_json::to_string(result)?));
        }
        if let Some(error) = &patch.error {
            fields.push("error = ?");
            values.push(SqlValue::Text(error.clone()));
        }
        if let Some(end_time) = patch.end_time {
            fields.push("end_time = ?");
            values.push(SqlValue::Integer(end_time.timestamp_millis()));
        }
        if let Some(duration_ms) = patch.duration_ms {
            fields.push("duration_ms = ?");
            values.push(SqlValue::Integer(duration_ms));
        }
        if let Some(tokens) = patch.tokens_in {
            fields.push("tokens_in = ?");
            values.push(SqlValue::Integer(clamp_u64(tokens)));
        }
        if let Some(tokens) = patch.tokens_out {
            fields.push("tokens_out = ?");
            values.push(SqlValue::Integer(clamp_u64(tokens)));
        }

        if fields.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "UPDATE tool_calls SET {} WHERE id = ? AND session_id = ?",
            fields.join(", ")
        );
        values.push(SqlValue::Text(id.to_string()));
        values.push(SqlValue::Text(session_id.to_string()));

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.blocking_lock();
            conn.execute(&sql, rusqlite::params_from_iter(values))?;
            Ok(())
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }

    /// List the most recently started sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_recent_sessions(
        &self,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<SessionSummary>, StoreError> {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT id, name, status, start_time, end_time, total_tokens_in,
                        total_tokens_out, estimated_cost, channel, user_id, agent_id
                 FROM sessions ORDER BY start_time DESC LIMIT ?1",
            )?;

            let sessions = stmt
                .query_map(params![limit], |row| {
                    let status: String = row.get(2)?;
                    let end_time: Option<i64> = row.get(4)?;
                    let total_tokens_in: i64 = row.get(5)?;
                    let total_tokens_out: i64 = row.get(6)?;
                    Ok(SessionSummary {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        status: SessionStatus::parse(&status).unwrap_or(SessionStatus::Running),
                        start_time: from_millis(row.get(3)?),
                        end_time: end_time.map(from_millis),
                        total_tokens_in: total_tokens_in.try_into().unwrap_or(0),
                        total_tokens_out: total_tokens_out.try_into().unwrap_or(0),
                        estimated_cost: row.get(7)?,
                        channel: row.get(8)?,
                        user_id: row.get(9)?,
                        agent_id: row.get(10)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(sessions)
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }

    /// List a session's tool calls in start order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_tool_calls(&self, session_id: &str) -> Result<Vec<ToolCall>, StoreError> {
        let session_id = session_id.to_string();

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<ToolCall>, StoreError> {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT id, tool_name, parameters, result, error, status, start_time,
                        end_time, duration_ms, tokens_in, tokens_out, parent_id
                 FROM tool_calls WHERE session_id = ?1 ORDER BY start_time ASC",
            )?;

            let calls = stmt
                .query_map(params![session_id], |row| {
                    let parameters: String = row.get(2)?;
                    let result: Option<String> = row.get(3)?;
                    let status: String = row.get(5)?;
                    let end_time: Option<i64> = row.get(7)?;
                    let tokens_in: Option<i64> = row.get(9)?;
                    let tokens_out: Option<i64> = row.get(10)?;
                    Ok(ToolCall {
                        id: row.get(0)?,
                        tool_name: row.get(1)?,
                        status: ToolStatus::parse(&status).unwrap_or(ToolStatus::Pending),
                        start_time: from_millis(row.get(6)?),
                        end_time: end_time.map(from_millis),
                        duration_ms: row.get(8)?,
                        parameters: serde_json::from_str(&parameters)
                            .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new())),
                        result: result.and_then(|r| serde_json::from_str(&r).ok()),
                        error: row.get(4)?,
                        tokens_in: tokens_in.map(|t| t.try_into().unwrap_or(0)),
                        tokens_out: tokens_out.map(|t| t.try_into().unwrap_or(0)),
                        parent_id: row.get(11)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(calls)
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }
}

fn clamp_u64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn sample_session(id: &str, start_secs: i64) -> Session {
        let mut session = Session::new(id, ts(start_secs));
        session.total_tokens_in = 120;
        session.total_tokens_out = 45;
        session.estimated_cost = 0.012;
        session.channel = Some("telegram".to_string());
        session
    }

    #[tokio::test]
    async fn test_upsert_and_list_sessions() {
        let store = SessionStore::open_in_memory().await.unwrap();
        store
            .upsert_session(&sample_session("s1", 1_700_000_000))
            .await
            .unwrap();
        store
            .upsert_session(&sample_session("s2", 1_700_000_100))
            .await
            .unwrap();

        let sessions = store.list_recent_sessions(10).await.unwrap();

        assert_eq!(sessions.len(), 2);
        // Newest first.
        assert_eq!(sessions[0].id, "s2");
        assert_eq!(sessions[1].id, "s1");
        assert_eq!(sessions[1].total_tokens_in, 120);
        assert_eq!(sessions[1].channel.as_deref(), Some("telegram"));
    }

    #[tokio::test]
    async fn test_list_respects_limit() {
        let store = SessionStore::open_in_memory().await.unwrap();
        for i in 0..5 {
            store
                .upsert_session(&sample_session(&format!("s{i}"), 1_700_000_000 + i))
                .await
                .unwrap();
        }

        let sessions = store.list_recent_sessions(2).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "s4");
    }

    #[tokio::test]
    async fn test_upsert_session_is_replacing() {
        let store = SessionStore::open_in_memory().await.unwrap();
        let mut session = sample_session("s1", 1_700_000_000);
        store.upsert_session(&session).await.unwrap();

        session.total_tokens_in = 500;
        store.upsert_session(&session).await.unwrap();

        let sessions = store.list_recent_sessions(10).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].total_tokens_in, 500);
    }

    #[tokio::test]
    async fn test_update_session_fields() {
        let store = SessionStore::open_in_memory().await.unwrap();
        store
            .upsert_session(&sample_session("s1", 1_700_000_000))
            .await
            .unwrap();

        let patch = SessionPatch {
            status: Some(SessionStatus::Failed),
            end_time: Some(ts(1_700_000_500)),
            total_tokens_in: Some(999),
            ..SessionPatch::default()
        };
        store.update_session_fields("s1", &patch).await.unwrap();

        let sessions = store.list_recent_sessions(10).await.unwrap();
        assert_eq!(sessions[0].status, SessionStatus::Failed);
        assert_eq!(sessions[0].total_tokens_in, 999);
        assert_eq!(sessions[0].end_time, Some(ts(1_700_000_500)));
        // Untouched fields survive.
        assert_eq!(sessions[0].total_tokens_out, 45);
    }

    #[tokio::test]
    async fn test_empty_patch_is_a_no_op() {
        let store = SessionStore::open_in_memory().await.unwrap();
        store
            .upsert_session(&sample_session("s1", 1_700_000_000))
            .await
            .unwrap();

        store
            .update_session_fields("s1", &SessionPatch::default())
            .await
            .unwrap();

        let sessions = store.list_recent_sessions(10).await.unwrap();
        assert_eq!(sessions[0].status, SessionStatus::Running);
    }

    #[tokio::test]
    async fn test_tool_call_roundtrip() {
        let store = SessionStore::open_in_memory().await.unwrap();
        store
            .upsert_session(&sample_session("s1", 1_700_000_000))
            .await
            .unwrap();

        let call = ToolCall::started("t1", "read", ts(1_700_000_010), json!({"path": "/x"}));
        store.upsert_tool_call("s1", &call).await.unwrap();

        let calls = store.list_tool_calls("s1").await.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "t1");
        assert_eq!(calls[0].tool_name, "read");
        assert_eq!(calls[0].status, ToolStatus::Running);
        assert_eq!(calls[0].parameters, json!({"path": "/x"}));
        assert!(calls[0].result.is_none());
    }

    #[tokio::test]
    async fn test_update_tool_call_fields() {
        let store = SessionStore::open_in_memory().await.unwrap();
        store
            .upsert_session(&sample_session("s1", 1_700_000_000))
            .await
            .unwrap();
        let call = ToolCall::started("t1", "exec", ts(1_700_000_010), json!({}));
        store.upsert_tool_call("s1", &call).await.unwrap();

        let patch = ToolCallPatch {
            status: Some(ToolStatus::Success),
            result: Some(json!({"ok": true})),
            end_time: Some(ts(1_700_000_013)),
            duration_ms: Some(3000),
            ..ToolCallPatch::default()
        };
        store
            .update_tool_call_fields("t1", "s1", &patch)
            .await
            .unwrap();

        let calls = store.list_tool_calls("s1").await.unwrap();
        assert_eq!(calls[0].status, ToolStatus::Success);
        assert_eq!(calls[0].result, Some(json!({"ok": true})));
        assert_eq!(calls[0].duration_ms, Some(3000));
    }

    #[tokio::test]
    async fn test_tool_calls_ordered_by_start_time() {
        let store = SessionStore::open_in_memory().await.unwrap();
        store
            .upsert_session(&sample_session("s1", 1_700_000_000))
            .await
            .unwrap();

        let later = ToolCall::started("t2", "write", ts(1_700_000_020), json!({}));
        let earlier = ToolCall::started("t1", "read", ts(1_700_000_010), json!({}));
        store.upsert_tool_call("s1", &later).await.unwrap();
        store.upsert_tool_call("s1", &earlier).await.unwrap();

        let calls = store.list_tool_calls("s1").await.unwrap();
        assert_eq!(calls[0].id, "t1");
        assert_eq!(calls[1].id, "t2");
    }

    #[tokio::test]
    async fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bridge.db");

        let store = SessionStore::open(&path).await.unwrap();

        assert_eq!(store.path(), Some(path.as_path()));
        assert!(path.exists());
    }
}
