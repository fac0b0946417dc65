//! Lifecycle event types and channel management.
//!
//! The poller publishes [`BridgeEvent`]s into a bounded broadcast
//! channel. Delivery is at-least-once and lossy under pressure: when a
//! consumer lags past the channel capacity the oldest events are dropped
//! for it rather than blocking the tailing loop — authoritative state is
//! always re-derivable from the next file read.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::model::{Message, Session, ToolCall};

/// Default capacity of the lifecycle event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A lifecycle notification emitted by the reconstruction engine.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// A session was observed for the first time this process lifetime.
    SessionStart(Session),
    /// A tracked session absorbed new data.
    SessionUpdate(Session),
    /// A tool call started.
    ToolCall {
        session_id: String,
        tool_call: ToolCall,
    },
    /// A tool call reached a terminal status.
    ToolUpdate {
        session_id: String,
        tool_call: ToolCall,
    },
    /// A conversation message was appended.
    Message {
        session_id: String,
        message: Message,
    },
}

impl BridgeEvent {
    /// Stable kind tag for logging and deduplication downstream.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeEvent::SessionStart(_) => "session_start",
            BridgeEvent::SessionUpdate(_) => "session_update",
            BridgeEvent::ToolCall { .. } => "tool_call",
            BridgeEvent::ToolUpdate { .. } => "tool_update",
            BridgeEvent::Message { .. } => "message",
        }
    }

    /// The session this event belongs to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            BridgeEvent::SessionStart(session) | BridgeEvent::SessionUpdate(session) => &session.id,
            BridgeEvent::ToolCall { session_id, .. }
            | BridgeEvent::ToolUpdate { session_id, .. }
            | BridgeEvent::Message { session_id, .. } => session_id,
        }
    }
}

/// Shared handles connecting the poller, sinks, and server.
#[derive(Debug, Clone)]
pub struct BridgeChannels {
    /// Lifecycle event fan-out.
    pub events: broadcast::Sender<BridgeEvent>,
    /// Cancellation token for graceful shutdown.
    pub cancel: CancellationToken,
}

/// Create the event channel and shutdown token.
#[must_use]
pub fn create_bridge_channels() -> BridgeChannels {
    let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
    BridgeChannels {
        events,
        cancel: CancellationToken::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_event_kind_tags() {
        let session = Session::new("s1", Utc::now());
        assert_eq!(BridgeEvent::SessionStart(session.clone()).kind(), "session_start");
        assert_eq!(BridgeEvent::SessionUpdate(session).kind(), "session_update");
    }

    #[test]
    fn test_event_session_id() {
        let session = Session::new("s1", Utc::now());
        assert_eq!(BridgeEvent::SessionStart(session.clone()).session_id(), "s1");

        let event = BridgeEvent::ToolCall {
            session_id: "s2".to_string(),
            tool_call: crate::model::ToolCall::started(
                "t1",
                "read",
                Utc::now(),
                serde_json::json!({}),
            ),
        };
        assert_eq!(event.session_id(), "s2");
        assert_eq!(event.kind(), "tool_call");
    }

    #[tokio::test]
    async fn test_channels_broadcast() {
        let channels = create_bridge_channels();
        let mut rx = channels.events.subscribe();

        let session = Session::new("s1", Utc::now());
        channels
            .events
            .send(BridgeEvent::SessionStart(session))
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind(), "session_start");
        assert!(!channels.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_lagging_receiver_sheds_oldest() {
        let (events, mut rx) = broadcast::channel(2);
        for i in 0..5 {
            let session = Session::new(format!("s{i}"), Utc::now());
            events.send(BridgeEvent::SessionUpdate(session)).unwrap();
        }

        // The receiver lagged; the oldest events are gone, not the newest.
        let result = rx.try_recv();
        assert!(matches!(
            result,
            Err(broadcast::error::TryRecvError::Lagged(_))
        ));
        let next = rx.try_recv().unwrap();
        assert_eq!(next.session_id(), "s3");
    }
}
