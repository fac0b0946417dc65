//! Session log tailing and reconstruction.
//!
//! The core of the bridge: incremental tailing of session `.jsonl`
//! files, tolerant multi-format event normalization, and stateful
//! correlation of tool-call start/result pairs into live session state.

mod aggregator;
mod correlator;
mod discovery;
mod error;
mod event;
mod offsets;
mod poller;
mod tailer;

pub use aggregator::SessionAggregator;
pub use correlator::ToolCallCorrelator;
pub use discovery::{default_sessions_dir, is_session_file, list_session_files, session_id_for};
pub use error::WatcherError;
pub use event::{
    normalize, MessageEvent, NormalizedEvent, SessionEndEvent, SessionMeta, ToolResultEvent,
    ToolStartEvent,
};
pub use offsets::{FileSignature, OffsetTracker};
pub use poller::{PollerConfig, SessionPoller, DEFAULT_POLL_INTERVAL};
pub use tailer::{parse_line, read_lines};
