//! Write-behind persistence of lifecycle events.
//!
//! Subscribes to the bridge event channel and mirrors state changes into
//! the store. Writes are fire-and-forget: failures are logged and never
//! retried synchronously, since the in-memory state stays authoritative
//! and the next session update rewrites the row.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::db::SessionStore;
use super::types::{SessionPatch, ToolCallPatch};
use crate::bridge::BridgeEvent;

/// Consumes lifecycle events and persists them.
pub struct StoreSink {
    store: Arc<SessionStore>,
    events: broadcast::Receiver<BridgeEvent>,
    cancel: CancellationToken,
}

impl StoreSink {
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        events: broadcast::Receiver<BridgeEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            events,
            cancel,
        }
    }

    /// Run until cancelled or the event channel closes.
    pub async fn run(self) {
        let Self {
            store,
            mut events,
            cancel,
        } = self;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Store sink stopping");
                    break;
                }
                event = events.recv() => match event {
                    Ok(event) => persist(&store, event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Store sink lagged; shed events are re-derived from later updates");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }
}

async fn persist(store: &SessionStore, event: BridgeEvent) {
    let kind = event.kind();
    let session_id = event.session_id().to_string();

    let result = match event {
        BridgeEvent::SessionStart(session) => store.upsert_session(&session).await,
        BridgeEvent::SessionUpdate(session) => {
            store
                .update_session_fields(&session.id, &SessionPatch::from_session(&session))
                .await
        }
        BridgeEvent::ToolCall {
            session_id,
            tool_call,
        } => store.upsert_tool_call(&session_id, &tool_call).await,
        BridgeEvent::ToolUpdate {
            session_id,
            tool_call,
        } => {
            store
                .update_tool_call_fields(
                    &tool_call.id,
                    &session_id,
                    &ToolCallPatch::from_call(&tool_call),
                )
                .await
        }
        // Messages live only in memory.
        BridgeEvent::Message { .. } => Ok(()),
    };

    if let Err(e) = result {
        tracing::warn!(kind, session_id, error = %e, "Failed to persist lifecycle event");
    }
}
