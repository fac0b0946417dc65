//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bridge::ServerConfig;
use crate::store::default_store_path;
use crate::watcher::default_sessions_dir;

/// Default polling interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Directory containing session `.jsonl` files.
    pub sessions_dir: PathBuf,
    /// How often to poll for new data, in milliseconds.
    pub poll_interval_ms: u64,
    /// Path to the `SQLite` database.
    pub database_path: PathBuf,
    /// WebSocket server settings.
    pub server: ServerConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sessions_dir: default_sessions_dir(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            database_path: default_store_path(),
            server: ServerConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// The polling interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
