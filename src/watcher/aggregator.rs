//! Session state aggregation.
//!
//! Owns all live session state and applies normalized events to it.
//! Every mutation is idempotent against re-delivery of the same log
//! segment: duplicate messages neither re-insert nor re-count usage,
//! replayed tool starts are skipped by id, and duplicate completions
//! leave terminal calls untouched.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use super::correlator::ToolCallCorrelator;
use super::event::{
    MessageEvent, NormalizedEvent, SessionEndEvent, SessionMeta, ToolResultEvent, ToolStartEvent,
};
use crate::bridge::BridgeEvent;
use crate::model::{short_name, Message, Role, Session, SessionStatus, SessionSummary, ToolCall};
use crate::pricing;

/// Owns per-session mutable state and applies normalized events.
///
/// The session map is never exposed by reference; all cross-component
/// reads return clones.
#[derive(Debug, Default)]
pub struct SessionAggregator {
    sessions: HashMap<String, Session>,
    correlator: ToolCallCorrelator,
    /// Composite message keys (session id, timestamp millis) already
    /// applied, guarding both insertion and usage accumulation.
    seen_messages: HashSet<(String, i64)>,
    unmatched_results: u64,
}

impl SessionAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a session id is currently tracked.
    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Number of tracked sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Count of tool results that matched no known call.
    #[must_use]
    pub fn unmatched_results(&self) -> u64 {
        self.unmatched_results
    }

    /// Snapshot of one session.
    #[must_use]
    pub fn session(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).cloned()
    }

    /// Snapshot of all sessions, most recently started first.
    #[must_use]
    pub fn sessions(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        sessions
    }

    /// Snapshot of a session's tool calls.
    #[must_use]
    pub fn tool_calls(&self, session_id: &str) -> Vec<ToolCall> {
        self.sessions
            .get(session_id)
            .map(|s| s.tool_calls.clone())
            .unwrap_or_default()
    }

    /// Snapshot of a session's messages.
    #[must_use]
    pub fn messages(&self, session_id: &str) -> Vec<Message> {
        self.sessions
            .get(session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    /// Merge historical session summaries into memory.
    ///
    /// Summaries whose id is already tracked are ignored — live data wins.
    /// Returns the number of sessions inserted.
    pub fn load_historical(&mut self, summaries: Vec<SessionSummary>) -> usize {
        let mut inserted = 0;
        for summary in summaries {
            if !self.sessions.contains_key(&summary.id) {
                self.sessions
                    .insert(summary.id.clone(), Session::from_summary(summary));
                inserted += 1;
            }
        }
        inserted
    }

    /// Apply one normalized event to the addressed session.
    ///
    /// Creates the session on first sight. Returns the immediate
    /// lifecycle notifications produced (tool calls, tool updates,
    /// messages); batch-level session notifications are the scheduler's
    /// responsibility.
    pub fn apply(&mut self, session_id: &str, event: NormalizedEvent) -> Vec<BridgeEvent> {
        self.ensure_session(session_id);
        let mut events = Vec::new();

        match event {
            NormalizedEvent::SessionMeta(meta) => self.apply_meta(session_id, &meta),
            NormalizedEvent::Message(message) => {
                self.apply_message(session_id, *message, &mut events);
            }
            NormalizedEvent::ToolStart(start) => self.start_tool(session_id, start, &mut events),
            NormalizedEvent::ToolResult(result) => {
                self.finish_tool(session_id, &result, &mut events);
            }
            NormalizedEvent::SessionEnd(end) => self.apply_end(session_id, &end),
        }

        events
    }

    fn ensure_session(&mut self, session_id: &str) {
        if !self.sessions.contains_key(session_id) {
            self.sessions
                .insert(session_id.to_string(), Session::new(session_id, Utc::now()));
        }
    }

    fn apply_meta(&mut self, session_id: &str, meta: &SessionMeta) {
        let Some(session) = self.sessions.get_mut(session_id) else {
            return;
        };
        if let Some(runtime_id) = &meta.runtime_id {
            session.name = short_name(runtime_id);
        }
        if let Some(timestamp) = meta.timestamp {
            session.start_time = timestamp;
        }
        if meta.channel.is_some() {
            session.channel.clone_from(&meta.channel);
        }
        if meta.user_id.is_some() {
            session.user_id.clone_from(&meta.user_id);
        }
        if meta.agent_id.is_some() {
            session.agent_id.clone_from(&meta.agent_id);
        }
    }

    fn apply_message(
        &mut self,
        session_id: &str,
        message: MessageEvent,
        events: &mut Vec<BridgeEvent>,
    ) {
        let key = message.timestamp.map(|t| t.timestamp_millis());
        let duplicate = key
            .is_some_and(|ms| self.seen_messages.contains(&(session_id.to_string(), ms)));

        if !duplicate {
            if let Some(ms) = key {
                self.seen_messages.insert((session_id.to_string(), ms));
            }
            if let Some(session) = self.sessions.get_mut(session_id) {
                let has_usage = message.tokens_in.is_some() || message.tokens_out.is_some();
                if has_usage {
                    let tokens_in = message.tokens_in.unwrap_or(0);
                    let tokens_out = message.tokens_out.unwrap_or(0);
                    session.total_tokens_in += tokens_in;
                    session.total_tokens_out += tokens_out;
                    session.estimated_cost +=
                        pricing::estimate_cost(message.model.as_deref(), tokens_in, tokens_out);
                }

                // Roles outside the conversation set (absent, "tool") are
                // only mined for embedded tool events.
                if let Some(role) = message.role.as_deref().and_then(Role::parse) {
                    let timestamp = message.timestamp.unwrap_or_else(Utc::now);
                    let stored = Message {
                        id: format!("{session_id}-{}", timestamp.timestamp_millis()),
                        role,
                        content: message.content.clone(),
                        timestamp,
                        model: message.model.clone(),
                        tokens_in: message.tokens_in,
                        tokens_out: message.tokens_out,
                    };
                    session.messages.push(stored.clone());
                    events.push(BridgeEvent::Message {
                        session_id: session_id.to_string(),
                        message: stored,
                    });
                }
            }
        }

        // Embedded correlations are processed even when the message body
        // itself is a duplicate.
        for start in message.tool_starts {
            self.start_tool(session_id, start, events);
        }
        for result in message.tool_results {
            self.finish_tool(session_id, &result, events);
        }
    }

    fn start_tool(
        &mut self,
        session_id: &str,
        start: ToolStartEvent,
        events: &mut Vec<BridgeEvent>,
    ) {
        let id = start
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let (call, index) = {
            let Some(session) = self.sessions.get_mut(session_id) else {
                return;
            };
            // Replays of the same log segment re-announce the same id.
            if session.tool_call(&id).is_some() {
                return;
            }
            let call = ToolCall::started(
                id.clone(),
                start.tool_name,
                start.timestamp.unwrap_or_else(Utc::now),
                start.parameters,
            );
            session.tool_calls.push(call.clone());
            (call, session.tool_calls.len() - 1)
        };

        self.correlator.on_start(session_id, &id, index);
        events.push(BridgeEvent::ToolCall {
            session_id: session_id.to_string(),
            tool_call: call,
        });
    }

    fn finish_tool(
        &mut self,
        session_id: &str,
        result: &ToolResultEvent,
        events: &mut Vec<BridgeEvent>,
    ) {
        let Self {
            sessions,
            correlator,
            unmatched_results,
            ..
        } = self;
        let Some(session) = sessions.get_mut(session_id) else {
            return;
        };

        if correlator.on_result(session_id, session, result) {
            if let Some(call) = session.tool_call(&result.correlation_id) {
                events.push(BridgeEvent::ToolUpdate {
                    session_id: session_id.to_string(),
                    tool_call: call.clone(),
                });
            }
        } else {
            *unmatched_results += 1;
            tracing::warn!(
                session_id,
                correlation_id = %result.correlation_id,
                "Discarding tool result with no matching call"
            );
        }
    }

    fn apply_end(&mut self, session_id: &str, end: &SessionEndEvent) {
        let Some(session) = self.sessions.get_mut(session_id) else {
            return;
        };
        // Terminal states never reopen; a stale duplicate end event is
        // ignored entirely, fields included.
        if session.status.is_terminal() {
            return;
        }
        session.status = if end.failed {
            SessionStatus::Failed
        } else {
            SessionStatus::Completed
        };
        session.end_time = Some(end.timestamp.unwrap_or_else(Utc::now));
    }
}
