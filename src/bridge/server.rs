//! WebSocket bridge server with axum router and graceful shutdown.

use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{get_status, ws_handler, AppState};

/// Default port the bridge listens on.
pub const DEFAULT_PORT: u16 = 3001;

/// Configuration for the bridge server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Host address to bind to.
    pub host: String,
    /// Whether to enable permissive CORS.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: "127.0.0.1".to_string(),
            cors_permissive: true,
        }
    }
}

/// WebSocket server republishing reconstructed state to viewers.
pub struct BridgeServer {
    config: ServerConfig,
    state: AppState,
    cancel: CancellationToken,
}

impl BridgeServer {
    /// Create a new bridge server with default configuration.
    #[must_use]
    pub fn new(state: AppState, cancel: CancellationToken) -> Self {
        Self {
            config: ServerConfig::default(),
            state,
            cancel,
        }
    }

    /// Set the server configuration (builder pattern).
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configured address as a string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/ws", get(ws_handler))
            .route("/api/status", get(get_status))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.cors_permissive {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Run the server until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or serve.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.address();
        let cancel = self.cancel.clone();
        let app = self.build_router();

        tracing::info!(address = %addr, "Starting bridge server");

        let listener = TcpListener::bind(&addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("Bridge server shutting down gracefully");
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::create_bridge_channels;
    use crate::watcher::SessionAggregator;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn test_state() -> (AppState, CancellationToken) {
        let channels = create_bridge_channels();
        (
            AppState::new(
                Arc::new(Mutex::new(SessionAggregator::new())),
                channels.events,
                None,
            ),
            channels.cancel,
        )
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.port, 3001);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.cors_permissive);
    }

    #[test]
    fn test_server_address() {
        let (state, cancel) = test_state();
        let server = BridgeServer::new(state, cancel);
        assert_eq!(server.address(), "127.0.0.1:3001");
    }

    #[test]
    fn test_server_with_config() {
        let (state, cancel) = test_state();
        let server = BridgeServer::new(state, cancel).with_config(ServerConfig {
            port: 8080,
            host: "0.0.0.0".to_string(),
            cors_permissive: false,
        });

        assert_eq!(server.address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_build_router() {
        let (state, cancel) = test_state();
        let server = BridgeServer::new(state, cancel);
        let _router = server.build_router();
    }

    #[test]
    fn test_config_loads_from_partial_toml() {
        let config: ServerConfig = toml::from_str("port = 4000").unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.host, "127.0.0.1");
    }
}
