//! WebSocket handlers for viewer clients.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

use super::api::{ClientCommand, ServerEvent, DEFAULT_HISTORY_LIMIT};
use super::state::BridgeEvent;
use crate::model::Session;
use crate::store::SessionStore;
use crate::watcher::SessionAggregator;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live session state, shared with the poller.
    pub aggregator: Arc<Mutex<SessionAggregator>>,
    /// Lifecycle event fan-out.
    pub events: broadcast::Sender<BridgeEvent>,
    /// Optional persistent store for history queries.
    pub store: Option<Arc<SessionStore>>,
}

impl AppState {
    #[must_use]
    pub fn new(
        aggregator: Arc<Mutex<SessionAggregator>>,
        events: broadcast::Sender<BridgeEvent>,
        store: Option<Arc<SessionStore>>,
    ) -> Self {
        Self {
            aggregator,
            events,
            store,
        }
    }
}

/// GET /api/status - engine health snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub sessions: usize,
    pub unmatched_results: u64,
    pub connected_clients: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let aggregator = state.aggregator.lock().await;
    Json(StatusResponse {
        sessions: aggregator.len(),
        unmatched_results: aggregator.unmatched_results(),
        connected_clients: state.events.receiver_count(),
    })
}

/// GET /ws - upgrade to the viewer WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    tracing::debug!("Viewer client connected");
    let (mut sink, mut stream) = socket.split();

    // Initial snapshot so the client renders without asking.
    let initial = ServerEvent::Sessions {
        data: state.aggregator.lock().await.sessions(),
    };
    if send_frame(&mut sink, &initial).await.is_err() {
        return;
    }

    let mut events = state.events.subscribe();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if send_frame(&mut sink, &ServerEvent::from(event)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Viewer client lagged; oldest events shed");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = stream.next() => match message {
                Some(Ok(WsMessage::Text(text))) => {
                    match serde_json::from_str::<ClientCommand>(&text) {
                        Ok(command) => {
                            if let Some(reply) = handle_command(&state, command).await {
                                if send_frame(&mut sink, &reply).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "Ignoring malformed client command");
                        }
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Viewer socket error");
                    break;
                }
            },
        }
    }

    tracing::debug!("Viewer client disconnected");
}

/// Answer one client command.
pub async fn handle_command(state: &AppState, command: ClientCommand) -> Option<ServerEvent> {
    match command {
        ClientCommand::GetSessions => Some(ServerEvent::Sessions {
            data: state.aggregator.lock().await.sessions(),
        }),
        ClientCommand::GetToolCalls { session_id } => {
            let mut calls = state.aggregator.lock().await.tool_calls(&session_id);
            // A session rehydrated from history has an empty in-memory
            // list; fetch its calls from the store on demand.
            if calls.is_empty() {
                if let Some(store) = &state.store {
                    match store.list_tool_calls(&session_id).await {
                        Ok(stored) => calls = stored,
                        Err(e) => {
                            tracing::warn!(session_id, error = %e, "Failed to load tool calls");
                        }
                    }
                }
            }
            Some(ServerEvent::ToolCalls {
                session_id,
                data: calls,
            })
        }
        ClientCommand::GetHistory { limit } => {
            let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
            if let Some(store) = &state.store {
                match store.list_recent_sessions(limit).await {
                    Ok(summaries) => {
                        return Some(ServerEvent::Sessions {
                            data: summaries.into_iter().map(Session::from_summary).collect(),
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to load session history"),
                }
            }
            Some(ServerEvent::Sessions {
                data: state.aggregator.lock().await.sessions(),
            })
        }
        ClientCommand::Ping => Some(ServerEvent::Pong),
    }
}

async fn send_frame(
    sink: &mut SplitSink<WebSocket, WsMessage>,
    frame: &ServerEvent,
) -> Result<(), axum::Error> {
    let Ok(json) = serde_json::to_string(frame) else {
        return Ok(());
    };
    sink.send(WsMessage::Text(json)).await
}
