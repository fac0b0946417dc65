//! WebSocket wire protocol types.
//!
//! Frames are JSON objects tagged by a SCREAMING_SNAKE `type` field with
//! camelCase payloads, matching what the viewer client speaks.

use serde::{Deserialize, Serialize};

use super::state::BridgeEvent;
use crate::model::{Message, Session, ToolCall};

/// Default history window when a client asks without a limit.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// A command received from a viewer client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    /// Request the current session snapshot.
    #[serde(rename = "GET_SESSIONS")]
    GetSessions,
    /// Request the tool calls of one session.
    #[serde(rename = "GET_TOOL_CALLS", rename_all = "camelCase")]
    GetToolCalls { session_id: String },
    /// Request persisted session history.
    #[serde(rename = "GET_HISTORY")]
    GetHistory {
        #[serde(default)]
        limit: Option<usize>,
    },
    /// Liveness probe.
    #[serde(rename = "PING")]
    Ping,
}

/// A frame sent to viewer clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "SESSIONS")]
    Sessions { data: Vec<Session> },
    #[serde(rename = "TOOL_CALLS", rename_all = "camelCase")]
    ToolCalls {
        session_id: String,
        data: Vec<ToolCall>,
    },
    #[serde(rename = "SESSION_START")]
    SessionStart { data: Session },
    #[serde(rename = "SESSION_UPDATE")]
    SessionUpdate { data: Session },
    #[serde(rename = "TOOL_CALL", rename_all = "camelCase")]
    ToolCall { session_id: String, data: ToolCall },
    #[serde(rename = "TOOL_UPDATE", rename_all = "camelCase")]
    ToolUpdate { session_id: String, data: ToolCall },
    #[serde(rename = "MESSAGE", rename_all = "camelCase")]
    Message { session_id: String, data: Message },
    #[serde(rename = "PONG")]
    Pong,
}

impl From<BridgeEvent> for ServerEvent {
    fn from(event: BridgeEvent) -> Self {
        match event {
            BridgeEvent::SessionStart(session) => ServerEvent::SessionStart { data: session },
            BridgeEvent::SessionUpdate(session) => ServerEvent::SessionUpdate { data: session },
            BridgeEvent::ToolCall {
                session_id,
                tool_call,
            } => ServerEvent::ToolCall {
                session_id,
                data: tool_call,
            },
            BridgeEvent::ToolUpdate {
                session_id,
                tool_call,
            } => ServerEvent::ToolUpdate {
                session_id,
                data: tool_call,
            },
            BridgeEvent::Message {
                session_id,
                message,
            } => ServerEvent::Message {
                session_id,
                data: message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_parse_get_sessions() {
        let command: ClientCommand = serde_json::from_str(r#"{"type":"GET_SESSIONS"}"#).unwrap();
        assert_eq!(command, ClientCommand::GetSessions);
    }

    #[test]
    fn test_parse_get_tool_calls() {
        let command: ClientCommand =
            serde_json::from_str(r#"{"type":"GET_TOOL_CALLS","sessionId":"abc123"}"#).unwrap();
        assert_eq!(
            command,
            ClientCommand::GetToolCalls {
                session_id: "abc123".to_string()
            }
        );
    }

    #[test]
    fn test_parse_get_history_with_and_without_limit() {
        let command: ClientCommand =
            serde_json::from_str(r#"{"type":"GET_HISTORY","limit":25}"#).unwrap();
        assert_eq!(command, ClientCommand::GetHistory { limit: Some(25) });

        let command: ClientCommand = serde_json::from_str(r#"{"type":"GET_HISTORY"}"#).unwrap();
        assert_eq!(command, ClientCommand::GetHistory { limit: None });
    }

    #[test]
    fn test_parse_unknown_command_fails() {
        assert!(serde_json::from_str::<ClientCommand>(r#"{"type":"SELF_DESTRUCT"}"#).is_err());
    }

    #[test]
    fn test_server_event_wire_shape() {
        let session = Session::new("abc123", Utc::now());
        let frame = serde_json::to_value(ServerEvent::SessionStart { data: session }).unwrap();

        assert_eq!(frame["type"], "SESSION_START");
        assert_eq!(frame["data"]["id"], "abc123");
        assert_eq!(frame["data"]["status"], "running");
    }

    #[test]
    fn test_tool_update_frame_carries_session_id() {
        let call = ToolCall::started("t1", "read", Utc::now(), json!({}));
        let frame = serde_json::to_value(ServerEvent::ToolUpdate {
            session_id: "abc123".to_string(),
            data: call,
        })
        .unwrap();

        assert_eq!(frame["type"], "TOOL_UPDATE");
        assert_eq!(frame["sessionId"], "abc123");
        assert_eq!(frame["data"]["toolName"], "read");
    }

    #[test]
    fn test_pong_frame() {
        let frame = serde_json::to_value(ServerEvent::Pong).unwrap();
        assert_eq!(frame, json!({"type": "PONG"}));
    }

    #[test]
    fn test_bridge_event_conversion() {
        let session = Session::new("s1", Utc::now());
        let event = ServerEvent::from(BridgeEvent::SessionUpdate(session));
        assert!(matches!(event, ServerEvent::SessionUpdate { .. }));

        let event = ServerEvent::from(BridgeEvent::Message {
            session_id: "s1".to_string(),
            message: Message {
                id: "s1-0".to_string(),
                role: crate::model::Role::User,
                content: json!("hi"),
                timestamp: Utc::now(),
                model: None,
                tokens_in: None,
                tokens_out: None,
            },
        });
        assert!(matches!(event, ServerEvent::Message { .. }));
    }
}
