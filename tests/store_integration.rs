//! Integration tests for the persistent store: file-backed database,
//! history rehydration, and the lifecycle-event sink.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;

use openclaw_bridge::bridge::{create_bridge_channels, BridgeEvent};
use openclaw_bridge::model::{Session, SessionStatus, ToolCall, ToolStatus};
use openclaw_bridge::store::{SessionStore, StoreSink};
use openclaw_bridge::watcher::SessionAggregator;

fn sample_session(id: &str, start_secs: i64) -> Session {
    let mut session = Session::new(id, Utc.timestamp_opt(start_secs, 0).unwrap());
    session.total_tokens_in = 10;
    session.total_tokens_out = 5;
    session
}

#[tokio::test]
async fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.db");

    {
        let store = SessionStore::open(&path).await.unwrap();
        store
            .upsert_session(&sample_session("s1", 1_700_000_000))
            .await
            .unwrap();
        let call = ToolCall::started(
            "t1",
            "read",
            Utc.timestamp_opt(1_700_000_010, 0).unwrap(),
            json!({"path": "/x"}),
        );
        store.upsert_tool_call("s1", &call).await.unwrap();
    }

    let store = SessionStore::open(&path).await.unwrap();
    let sessions = store.list_recent_sessions(10).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, "s1");

    let calls = store.list_tool_calls("s1").await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].parameters, json!({"path": "/x"}));
}

#[tokio::test]
async fn history_rehydrates_into_aggregator() {
    let store = SessionStore::open_in_memory().await.unwrap();
    let mut ended = sample_session("hist-1", 1_700_000_000);
    ended.status = SessionStatus::Completed;
    ended.end_time = Some(Utc.timestamp_opt(1_700_000_900, 0).unwrap());
    store.upsert_session(&ended).await.unwrap();

    let summaries = store.list_recent_sessions(100).await.unwrap();
    let mut aggregator = SessionAggregator::new();
    let inserted = aggregator.load_historical(summaries);

    assert_eq!(inserted, 1);
    let session = aggregator.session("hist-1").unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.total_tokens_in, 10);
    // Rehydrated sessions start with empty lists.
    assert!(session.tool_calls.is_empty());
    assert!(session.messages.is_empty());
}

#[tokio::test]
async fn sink_mirrors_a_full_tool_lifecycle() {
    let store = Arc::new(SessionStore::open_in_memory().await.unwrap());
    let channels = create_bridge_channels();
    let sink = StoreSink::new(
        store.clone(),
        channels.events.subscribe(),
        channels.cancel.clone(),
    );
    let handle = tokio::spawn(sink.run());

    let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let mut session = Session::new("s1", start);
    channels
        .events
        .send(BridgeEvent::SessionStart(session.clone()))
        .unwrap();

    let mut call = ToolCall::started("t1", "exec", start, json!({"command": "ls"}));
    channels
        .events
        .send(BridgeEvent::ToolCall {
            session_id: "s1".to_string(),
            tool_call: call.clone(),
        })
        .unwrap();

    call.status = ToolStatus::Error;
    call.error = Some("exit 1".to_string());
    call.end_time = Some(Utc.timestamp_opt(1_700_000_002, 0).unwrap());
    call.duration_ms = Some(2000);
    channels
        .events
        .send(BridgeEvent::ToolUpdate {
            session_id: "s1".to_string(),
            tool_call: call,
        })
        .unwrap();

    session.status = SessionStatus::Completed;
    session.end_time = Some(Utc.timestamp_opt(1_700_000_003, 0).unwrap());
    channels
        .events
        .send(BridgeEvent::SessionUpdate(session))
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(80)).await;
    channels.cancel.cancel();
    handle.await.unwrap();

    let sessions = store.list_recent_sessions(10).await.unwrap();
    assert_eq!(sessions[0].status, SessionStatus::Completed);

    let calls = store.list_tool_calls("s1").await.unwrap();
    assert_eq!(calls[0].status, ToolStatus::Error);
    assert_eq!(calls[0].error.as_deref(), Some("exit 1"));
    assert_eq!(calls[0].duration_ms, Some(2000));
}
