//! OpenClaw Bridge - live session reconstruction for agent runtime logs.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use openclaw_bridge::bridge::{
    create_bridge_channels, AppState, BridgeServer, DEFAULT_HISTORY_LIMIT,
};
use openclaw_bridge::config::{BridgeConfig, ConfigLoader};
use openclaw_bridge::store::{SessionStore, StoreSink};
use openclaw_bridge::watcher::{PollerConfig, SessionAggregator, SessionPoller};

#[derive(Parser)]
#[command(
    name = "openclaw-bridge",
    about = "Live session bridge for OpenClaw agent logs",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail session logs and serve the viewer WebSocket.
    Serve {
        /// Path to a config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the sessions directory.
        #[arg(long)]
        sessions_dir: Option<PathBuf>,
        /// Override the server port.
        #[arg(short, long)]
        port: Option<u16>,
        /// Override the database path.
        #[arg(long)]
        db: Option<PathBuf>,
        /// Override the poll interval in milliseconds.
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Run without persistent storage.
        #[arg(long)]
        no_store: bool,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Serve {
            config,
            sessions_dir,
            port,
            db,
            interval_ms,
            no_store,
        } => {
            if let Err(e) = serve(config, sessions_dir, port, db, interval_ms, no_store).await {
                tracing::error!(error = %e, "Bridge exited with error");
                std::process::exit(1);
            }
        }
    }
}

async fn serve(
    config_path: Option<PathBuf>,
    sessions_dir: Option<PathBuf>,
    port: Option<u16>,
    db: Option<PathBuf>,
    interval_ms: Option<u64>,
    no_store: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config: BridgeConfig = match config_path {
        Some(path) => ConfigLoader::with_path(path).load()?,
        None => ConfigLoader::new().load()?,
    };
    if let Some(dir) = sessions_dir {
        config.sessions_dir = dir;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(db) = db {
        config.database_path = db;
    }
    if let Some(interval_ms) = interval_ms {
        config.poll_interval_ms = interval_ms;
    }

    tracing::info!(
        sessions_dir = %config.sessions_dir.display(),
        interval_ms = config.poll_interval_ms,
        port = config.server.port,
        "Starting OpenClaw bridge"
    );

    let channels = create_bridge_channels();
    let aggregator = Arc::new(Mutex::new(SessionAggregator::new()));

    let store = if no_store {
        None
    } else {
        match SessionStore::open(&config.database_path).await {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to open store; running memory-only");
                None
            }
        }
    };

    if let Some(store) = &store {
        match store.list_recent_sessions(DEFAULT_HISTORY_LIMIT).await {
            Ok(summaries) => {
                let inserted = aggregator.lock().await.load_historical(summaries);
                tracing::info!(inserted, "Loaded historical sessions");
            }
            Err(e) => tracing::warn!(error = %e, "Failed to load historical sessions"),
        }

        let sink = StoreSink::new(
            store.clone(),
            channels.events.subscribe(),
            channels.cancel.clone(),
        );
        tokio::spawn(sink.run());
    }

    let poller = SessionPoller::new(
        PollerConfig::new(config.sessions_dir.clone()).with_interval(config.poll_interval()),
        aggregator.clone(),
        channels.events.clone(),
        channels.cancel.clone(),
    );
    let poller_handle = tokio::spawn(poller.run());

    let state = AppState::new(aggregator, channels.events.clone(), store);
    let server = BridgeServer::new(state, channels.cancel.clone()).with_config(config.server);

    let cancel = channels.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received ctrl-c, shutting down");
            cancel.cancel();
        }
    });

    server.run().await?;
    channels.cancel.cancel();
    let _ = poller_handle.await;

    Ok(())
}
