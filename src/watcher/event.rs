//! Event normalizer for heterogeneous session records.
//!
//! Raw records arrive in several overlapping schema generations. This
//! module classifies each parsed JSON record into one canonical
//! [`NormalizedEvent`] kind, extracting tool-call correlation ids and
//! result payloads through small ordered alias lists — the first alias
//! that yields a value wins. Anything unrecognized is skipped, never an
//! error.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Correlation-id aliases for tool results embedded in message content.
const EMBEDDED_RESULT_ID_KEYS: &[&str] = &["toolCallId", "tool_use_id", "id"];
/// Result-payload aliases for tool results embedded in message content.
const EMBEDDED_RESULT_PAYLOAD_KEYS: &[&str] = &["result", "output", "content"];
/// Correlation-id aliases for results carried on a user-role message body.
const CARRIER_ID_KEYS: &[&str] = &["tool_use_id", "toolCallId"];
/// Result-payload aliases for the user-message carrier shape.
const CARRIER_PAYLOAD_KEYS: &[&str] = &["result", "content", "text"];
/// Correlation-id aliases for legacy top-level tool results.
const LEGACY_RESULT_ID_KEYS: &[&str] = &["id", "call_id"];
/// Tool-name aliases for legacy top-level tool starts.
const LEGACY_NAME_KEYS: &[&str] = &["tool", "toolName"];
/// Parameter aliases for legacy top-level tool starts.
const LEGACY_PARAM_KEYS: &[&str] = &["params", "parameters"];
const AGENT_TAG_KEYS: &[&str] = &["agent_id", "agentId"];
const USER_TAG_KEYS: &[&str] = &["user_id", "userId"];

/// One raw record classified into a canonical event kind.
#[derive(Debug, Clone)]
pub enum NormalizedEvent {
    SessionMeta(SessionMeta),
    Message(Box<MessageEvent>),
    ToolStart(ToolStartEvent),
    ToolResult(ToolResultEvent),
    SessionEnd(SessionEndEvent),
}

/// Session metadata record.
#[derive(Debug, Clone)]
pub struct SessionMeta {
    /// The runtime's own session id, used for the display name.
    pub runtime_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub channel: Option<String>,
    pub user_id: Option<String>,
    pub agent_id: Option<String>,
}

/// A conversation message, possibly carrying embedded tool events.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub role: Option<String>,
    pub content: Value,
    pub timestamp: Option<DateTime<Utc>>,
    pub model: Option<String>,
    pub tokens_in: Option<u64>,
    pub tokens_out: Option<u64>,
    /// Tool-call starts found in the content array.
    pub tool_starts: Vec<ToolStartEvent>,
    /// Tool results found in the content array or on the message body.
    pub tool_results: Vec<ToolResultEvent>,
}

/// A tool invocation start.
#[derive(Debug, Clone)]
pub struct ToolStartEvent {
    /// Call id; absent ids get generated by the aggregator.
    pub id: Option<String>,
    pub tool_name: String,
    pub parameters: Value,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A tool completion, to be correlated back to its start.
#[derive(Debug, Clone)]
pub struct ToolResultEvent {
    pub correlation_id: String,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A session termination record.
#[derive(Debug, Clone)]
pub struct SessionEndEvent {
    /// True when the record signals an error outcome.
    pub failed: bool,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Classify one raw record into a canonical event.
///
/// Returns `None` for records with a missing or unrecognized `type` —
/// such records are skipped, not errors. Absent optional fields default
/// to neutral values; malformed nested fields never panic.
#[must_use]
pub fn normalize(record: &Value) -> Option<NormalizedEvent> {
    let kind = record.get("type")?.as_str()?;
    let timestamp = parse_timestamp(record.get("timestamp"));

    match kind {
        "session" => Some(NormalizedEvent::SessionMeta(SessionMeta {
            runtime_id: record.get("id").and_then(Value::as_str).map(String::from),
            timestamp,
            channel: record
                .get("channel")
                .and_then(Value::as_str)
                .map(String::from),
            user_id: first_string(record, USER_TAG_KEYS),
            agent_id: first_string(record, AGENT_TAG_KEYS),
        })),
        "message" => Some(NormalizedEvent::Message(Box::new(normalize_message(
            record, timestamp,
        )))),
        "tool_start" | "tool_call" => Some(NormalizedEvent::ToolStart(ToolStartEvent {
            id: record.get("id").and_then(Value::as_str).map(String::from),
            tool_name: first_string(record, LEGACY_NAME_KEYS)
                .unwrap_or_else(|| "unknown".to_string()),
            parameters: first_value(record, LEGACY_PARAM_KEYS).unwrap_or_else(empty_object),
            timestamp,
        })),
        "tool_end" | "tool_result" => {
            // A result that names no call at all cannot be delivered.
            let correlation_id = first_string(record, LEGACY_RESULT_ID_KEYS)?;
            Some(NormalizedEvent::ToolResult(ToolResultEvent {
                correlation_id,
                result: record.get("result").filter(|v| !v.is_null()).cloned(),
                error: error_string(record.get("error")),
                timestamp,
            }))
        }
        "session_end" => Some(NormalizedEvent::SessionEnd(SessionEndEvent {
            failed: record.get("status").and_then(Value::as_str) == Some("error"),
            timestamp,
        })),
        _ => None,
    }
}

fn normalize_message(record: &Value, timestamp: Option<DateTime<Utc>>) -> MessageEvent {
    let message = record.get("message");
    let usage = message.and_then(|m| m.get("usage"));
    let role = message
        .and_then(|m| m.get("role"))
        .and_then(Value::as_str)
        .map(String::from);
    let content = message
        .and_then(|m| m.get("content"))
        .cloned()
        .unwrap_or(Value::Null);

    let mut tool_starts = Vec::new();
    let mut tool_results = Vec::new();

    if let Some(blocks) = content.as_array() {
        for block in blocks {
            match block.get("type").and_then(Value::as_str) {
                Some("toolCall") => tool_starts.push(ToolStartEvent {
                    id: block.get("id").and_then(Value::as_str).map(String::from),
                    tool_name: block
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    parameters: block
                        .get("arguments")
                        .filter(|v| !v.is_null())
                        .cloned()
                        .unwrap_or_else(empty_object),
                    timestamp,
                }),
                Some("tool_result" | "toolResult") => {
                    if let Some(correlation_id) = first_string(block, EMBEDDED_RESULT_ID_KEYS) {
                        tool_results.push(ToolResultEvent {
                            correlation_id,
                            result: first_value(block, EMBEDDED_RESULT_PAYLOAD_KEYS),
                            error: error_string(block.get("error")),
                            timestamp,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    // Some producers attach the result to the user turn itself rather than
    // a content-array entry: a user message whose first content fragment
    // (or whole content object) carries a correlation id is also a result.
    if role.as_deref() == Some("user") {
        let null = Value::Null;
        let carrier = match content.as_array() {
            Some(blocks) => blocks.first().unwrap_or(&null),
            None => &content,
        };
        if let Some(correlation_id) = first_string(carrier, CARRIER_ID_KEYS) {
            let already_captured = tool_results
                .iter()
                .any(|r| r.correlation_id == correlation_id);
            if !already_captured {
                tool_results.push(ToolResultEvent {
                    correlation_id,
                    result: first_value(carrier, CARRIER_PAYLOAD_KEYS),
                    error: error_string(carrier.get("error")),
                    timestamp,
                });
            }
        }
    }

    MessageEvent {
        role,
        content,
        timestamp,
        model: message
            .and_then(|m| m.get("model"))
            .and_then(Value::as_str)
            .map(String::from),
        tokens_in: usage.and_then(|u| u.get("input")).and_then(Value::as_u64),
        tokens_out: usage.and_then(|u| u.get("output")).and_then(Value::as_u64),
        tool_starts,
        tool_results,
    }
}

/// First alias key whose value is a string.
fn first_string(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| record.get(key).and_then(Value::as_str))
        .map(String::from)
}

/// First alias key whose value is present and non-null.
fn first_value(record: &Value, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .find_map(|key| record.get(key).filter(|v| !v.is_null()))
        .cloned()
}

/// Coerce an error field to a string, tolerating non-string payloads.
fn error_string(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Parse a timestamp field as RFC 3339 or epoch milliseconds.
fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(ms)),
        _ => None,
    }
}
