//! Polling tailing scheduler.
//!
//! The driving loop of the bridge: on a fixed interval it lists session
//! files, asks the offset tracker what is new, streams new lines through
//! normalize → aggregate, and emits lifecycle notifications. All state
//! mutation happens on this one task; the aggregator lock is held per
//! applied event, never across file I/O.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;

use super::aggregator::SessionAggregator;
use super::discovery::list_session_files;
use super::error::WatcherError;
use super::event::normalize;
use super::offsets::{FileSignature, OffsetTracker};
use super::tailer;
use crate::bridge::BridgeEvent;

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Configuration for the tailing scheduler.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Directory containing session `.jsonl` files.
    pub sessions_dir: PathBuf,
    /// How often to scan for new data.
    pub interval: Duration,
}

impl PollerConfig {
    #[must_use]
    pub fn new(sessions_dir: PathBuf) -> Self {
        Self {
            sessions_dir,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Periodically tails session files and feeds the aggregator.
pub struct SessionPoller {
    config: PollerConfig,
    offsets: OffsetTracker,
    aggregator: Arc<Mutex<SessionAggregator>>,
    events: broadcast::Sender<BridgeEvent>,
    cancel: CancellationToken,
    skipped_lines: u64,
}

impl SessionPoller {
    #[must_use]
    pub fn new(
        config: PollerConfig,
        aggregator: Arc<Mutex<SessionAggregator>>,
        events: broadcast::Sender<BridgeEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            offsets: OffsetTracker::new(),
            aggregator,
            events,
            cancel,
            skipped_lines: 0,
        }
    }

    /// Count of lines that failed to parse as JSON (partial writes).
    #[must_use]
    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines
    }

    /// Run the scheduling loop until cancelled.
    ///
    /// A missing sessions directory is a startup warning, not an error:
    /// the loop idles and picks the directory up once it appears.
    pub async fn run(mut self) {
        if !self.config.sessions_dir.is_dir() {
            tracing::warn!(
                path = %self.config.sessions_dir.display(),
                "Sessions directory does not exist yet; waiting for it to appear"
            );
        }
        tracing::info!(
            path = %self.config.sessions_dir.display(),
            interval_ms = self.config.interval.as_millis(),
            "Starting session poller"
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let cancel = self.cancel.clone();

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Session poller stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One scheduling tick: scan every candidate file for new bytes.
    ///
    /// A read error on one file skips its offset commit and moves on to
    /// the remaining files; the next tick retries it.
    pub async fn tick(&mut self) {
        let files = match list_session_files(&self.config.sessions_dir) {
            Ok(files) => files,
            Err(e) => {
                tracing::debug!(error = %e, "Sessions directory not readable this tick");
                return;
            }
        };

        for (session_id, path) in files {
            if self.cancel.is_cancelled() {
                return;
            }

            let signature = match stat_signature(&path).await {
                Ok(signature) => signature,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to stat session file");
                    continue;
                }
            };

            let Some(from) = self.offsets.should_process(&session_id, signature) else {
                continue;
            };
            if from == 0 && self.offsets.get(&session_id).is_some_and(|prev| prev.size > 0) {
                tracing::warn!(
                    session_id,
                    new_size = signature.size,
                    "Session file shrank; re-reading from the start"
                );
            }

            match self.process_file(&path, &session_id, from, signature.size).await {
                Ok(()) => self.offsets.commit(&session_id, signature),
                Err(WatcherError::Cancelled) => return,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read session file");
                }
            }
        }
    }

    /// Stream one file's new lines through the pipeline.
    ///
    /// Emits per-entity notifications as they are produced, then exactly
    /// one batch-level `session_start`/`session_update` depending on
    /// whether the session existed before this file's processing began.
    async fn process_file(
        &mut self,
        path: &Path,
        session_id: &str,
        from: u64,
        to: u64,
    ) -> Result<(), WatcherError> {
        let lines = tailer::read_lines(path, from, to).await?;
        let existed = self.aggregator.lock().await.contains(session_id);

        for line in lines {
            if self.cancel.is_cancelled() {
                return Err(WatcherError::Cancelled);
            }
            let Some(record) = tailer::parse_line(&line) else {
                self.skipped_lines += 1;
                continue;
            };
            let Some(event) = normalize(&record) else {
                continue;
            };
            let notifications = self.aggregator.lock().await.apply(session_id, event);
            for notification in notifications {
                let _ = self.events.send(notification);
            }
        }

        let snapshot = self.aggregator.lock().await.session(session_id);
        if let Some(session) = snapshot {
            let event = if existed {
                BridgeEvent::SessionUpdate(session)
            } else {
                BridgeEvent::SessionStart(session)
            };
            let _ = self.events.send(event);
        }

        Ok(())
    }
}

/// Stat a file into a [`FileSignature`].
async fn stat_signature(path: &Path) -> std::io::Result<FileSignature> {
    let metadata = tokio::fs::metadata(path).await?;
    let mtime_ms = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or(0);
    Ok(FileSignature::new(metadata.len(), mtime_ms))
}
