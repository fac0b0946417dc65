//! Broadcast layer: lifecycle events and the viewer WebSocket server.

mod api;
mod handlers;
mod server;
mod state;

pub use api::{ClientCommand, ServerEvent, DEFAULT_HISTORY_LIMIT};
pub use handlers::{get_status, handle_command, ws_handler, AppState, StatusResponse};
pub use server::{BridgeServer, ServerConfig, DEFAULT_PORT};
pub use state::{create_bridge_channels, BridgeChannels, BridgeEvent, DEFAULT_EVENT_CAPACITY};
