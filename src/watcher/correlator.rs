//! Tool-call start/result correlation.
//!
//! Completion records reference their originating call through any of
//! several alias keys, and may arrive before the poller has the call in
//! its fast map (e.g. the start was read in a prior poll). Matching goes
//! through the per-session fast map first, then falls back to a linear
//! scan of the session's tool-call list.

use std::collections::HashMap;

use chrono::Utc;

use super::event::ToolResultEvent;
use crate::model::{Session, ToolStatus};

/// Correlates tool completion events to in-flight tool calls.
///
/// The fast map holds, per session, the index of each in-flight call in
/// that session's `tool_calls` list. The list is append-only, so indices
/// stay valid for the lifetime of the session.
#[derive(Debug, Default)]
pub struct ToolCallCorrelator {
    pending: HashMap<String, HashMap<String, usize>>,
}

impl ToolCallCorrelator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly started call at its index in the session list.
    pub fn on_start(&mut self, session_id: &str, call_id: &str, index: usize) {
        self.pending
            .entry(session_id.to_string())
            .or_default()
            .insert(call_id.to_string(), index);
    }

    /// Number of in-flight calls for a session.
    #[must_use]
    pub fn pending_count(&self, session_id: &str) -> usize {
        self.pending.get(session_id).map_or(0, HashMap::len)
    }

    /// Match a completion event to its call and apply the terminal state.
    ///
    /// Precedence: exact id in the fast map, then linear scan of the
    /// session's tool-call list by id. On match the call becomes `error`
    /// when an error payload is present (even alongside a result),
    /// otherwise `success`; the duration is computed from the event
    /// timestamp and clamped to zero against clock skew. A call that is
    /// already terminal is left untouched. Returns whether a call was
    /// matched so the caller can count unmatched results.
    pub fn on_result(
        &mut self,
        session_id: &str,
        session: &mut Session,
        event: &ToolResultEvent,
    ) -> bool {
        let from_map = self
            .pending
            .get_mut(session_id)
            .and_then(|calls| calls.remove(&event.correlation_id));

        let index = from_map.or_else(|| {
            session
                .tool_calls
                .iter()
                .position(|call| call.id == event.correlation_id)
        });

        let Some(index) = index else {
            return false;
        };

        let call = &mut session.tool_calls[index];
        if call.status.is_terminal() {
            // Duplicate completion from a replayed segment.
            return true;
        }

        call.status = if event.error.is_some() {
            ToolStatus::Error
        } else {
            ToolStatus::Success
        };
        let end_time = event.timestamp.unwrap_or_else(Utc::now);
        call.end_time = Some(end_time);
        call.duration_ms = Some((end_time - call.start_time).num_milliseconds().max(0));
        call.result = event.result.clone();
        call.error = event.error.clone();

        true
    }
}
