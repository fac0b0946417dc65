//! Core session model types.
//!
//! These are the reconstructed entities the bridge maintains in memory,
//! persists through the store, and republishes over the wire. Field names
//! serialize in camelCase to match the viewer protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a session.
///
/// Any status other than `Running` is terminal: once a session leaves
/// `Running` it never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    /// Whether this status is terminal (no further transitions allowed).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Running)
    }

    /// The lowercase wire/storage spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the lowercase spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(SessionStatus::Running),
            "completed" => Some(SessionStatus::Completed),
            "failed" => Some(SessionStatus::Failed),
            "cancelled" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }
}

/// Lifecycle status of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Running,
    Success,
    Error,
}

impl ToolStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ToolStatus::Success | ToolStatus::Error)
    }

    /// The lowercase wire/storage spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ToolStatus::Pending => "pending",
            ToolStatus::Running => "running",
            ToolStatus::Success => "success",
            ToolStatus::Error => "error",
        }
    }

    /// Parse the lowercase spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ToolStatus::Pending),
            "running" => Some(ToolStatus::Running),
            "success" => Some(ToolStatus::Success),
            "error" => Some(ToolStatus::Error),
            _ => None,
        }
    }
}

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Parse a role string from a raw record.
    ///
    /// Returns `None` for absent or non-conversation roles (e.g. `tool`),
    /// which are mined for embedded tool events but never stored.
    #[must_use]
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// One invocation of a named capability within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Identifier, unique within the owning session.
    pub id: String,
    /// Name of the invoked tool.
    pub tool_name: String,
    pub status: ToolStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Wall-clock duration, computed as `end_time - start_time` and clamped
    /// to zero. Never taken from the input record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    /// Opaque input parameters. Defaults to an empty object.
    #[serde(default = "empty_object")]
    pub parameters: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_out: Option<u64>,
    /// Parent call id for nested invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl ToolCall {
    /// Create a running tool call with defaulted optional fields.
    #[must_use]
    pub fn started(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        start_time: DateTime<Utc>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            status: ToolStatus::Running,
            start_time,
            end_time: None,
            duration_ms: None,
            parameters,
            result: None,
            error: None,
            tokens_in: None,
            tokens_out: None,
            parent_id: None,
        }
    }
}

/// One conversation message within a session.
///
/// Identity is the composite of session id and source timestamp; the `id`
/// field carries that composite for the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    /// Opaque content: plain text or a mixed array of fragments.
    pub content: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_out: Option<u64>,
}

/// One logical unit of agent work, aggregating messages and tool calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Stable id, derived from the source file name.
    pub id: String,
    pub name: String,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub total_tokens_in: u64,
    pub total_tokens_out: u64,
    /// Cumulative estimated cost in USD.
    pub estimated_cost: f64,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl Session {
    /// Create a fresh running session for the given id.
    ///
    /// The display name defaults to the first 8 characters of the id.
    #[must_use]
    pub fn new(id: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        let id = id.into();
        let name = short_name(&id);
        Self {
            id,
            name,
            status: SessionStatus::Running,
            start_time,
            end_time: None,
            total_tokens_in: 0,
            total_tokens_out: 0,
            estimated_cost: 0.0,
            tool_calls: Vec::new(),
            messages: Vec::new(),
            channel: None,
            user_id: None,
            agent_id: None,
        }
    }

    /// Rehydrate a session from a persisted summary, with empty lists.
    #[must_use]
    pub fn from_summary(summary: SessionSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            status: summary.status,
            start_time: summary.start_time,
            end_time: summary.end_time,
            total_tokens_in: summary.total_tokens_in,
            total_tokens_out: summary.total_tokens_out,
            estimated_cost: summary.estimated_cost,
            tool_calls: Vec::new(),
            messages: Vec::new(),
            channel: summary.channel,
            user_id: summary.user_id,
            agent_id: summary.agent_id,
        }
    }

    /// Find a tool call by id.
    #[must_use]
    pub fn tool_call(&self, id: &str) -> Option<&ToolCall> {
        self.tool_calls.iter().find(|c| c.id == id)
    }
}

/// Derive a short display name from a session id.
#[must_use]
pub fn short_name(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Scalar view of a session as stored, without the tool-call/message lists.
///
/// This is the shape the store returns from `list_recent_sessions` and the
/// aggregator accepts for historical merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub name: String,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub total_tokens_in: u64,
    pub total_tokens_out: u64,
    pub estimated_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            name: session.name.clone(),
            status: session.status,
            start_time: session.start_time,
            end_time: session.end_time,
            total_tokens_in: session.total_tokens_in,
            total_tokens_out: session.total_tokens_out,
            estimated_cost: session.estimated_cost,
            channel: session.channel.clone(),
            user_id: session.user_id.clone(),
            agent_id: session.agent_id.clone(),
        }
    }
}
