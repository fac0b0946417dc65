//! Partial-update patch types for the store interface.

use chrono::{DateTime, Utc};

use crate::model::{Session, SessionStatus, ToolCall, ToolStatus};

/// Fields of a session row to update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub name: Option<String>,
    pub status: Option<SessionStatus>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_tokens_in: Option<u64>,
    pub total_tokens_out: Option<u64>,
    pub estimated_cost: Option<f64>,
}

impl SessionPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.status.is_none()
            && self.end_time.is_none()
            && self.total_tokens_in.is_none()
            && self.total_tokens_out.is_none()
            && self.estimated_cost.is_none()
    }

    /// The progress fields of a live session, as the sink writes them on
    /// every session update.
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        Self {
            name: Some(session.name.clone()),
            status: Some(session.status),
            end_time: session.end_time,
            total_tokens_in: Some(session.total_tokens_in),
            total_tokens_out: Some(session.total_tokens_out),
            estimated_cost: Some(session.estimated_cost),
        }
    }
}

/// Fields of a tool-call row to update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ToolCallPatch {
    pub status: Option<ToolStatus>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub tokens_in: Option<u64>,
    pub tokens_out: Option<u64>,
}

impl ToolCallPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.result.is_none()
            && self.error.is_none()
            && self.end_time.is_none()
            && self.duration_ms.is_none()
            && self.tokens_in.is_none()
            && self.tokens_out.is_none()
    }

    /// The completion fields of a finished call.
    #[must_use]
    pub fn from_call(call: &ToolCall) -> Self {
        Self {
            status: Some(call.status),
            result: call.result.clone(),
            error: call.error.clone(),
            end_time: call.end_time,
            duration_ms: call.duration_ms,
            tokens_in: call.tokens_in,
            tokens_out: call.tokens_out,
        }
    }
}
