//! voice-workflow-daemon: owns the recording session for the desktop app
//!
//! Hosts a single session state machine and exposes it over a Unix socket:
//! - UI clients read snapshots and subscribe to session events
//! - Hotkey and capture helpers dispatch recording actions
//! - Transcription/enrichment workers dispatch completion or error actions

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use voice_workflow::config::Config;
use voice_workflow::events::SessionEvent;
use voice_workflow::ipc::Server;
use voice_workflow::lifecycle::ShutdownSignal;
use voice_workflow::state::{SessionHandle, StateMachine};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "voice-workflow-daemon starting"
    );
    info!(?config.socket_path, "configuration loaded");

    config.ensure_dirs()?;

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Clients -> state machine
    let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
    // State machine -> subscribed clients
    let (event_tx, _event_rx) = broadcast::channel::<SessionEvent>(config.event_buffer);

    // Create the state machine
    let mut state_machine = StateMachine::new(event_tx.clone());

    // Create IPC server
    let server = Server::new(&config.socket_path, SessionHandle::new(command_tx), event_tx)?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Run the state machine (applies dispatched actions in order)
        _ = state_machine.run(command_rx) => {
            info!("state machine exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Wait for shutdown signal
        result = shutdown.wait() => {
            match result {
                Ok(reason) => info!(?reason, "shutdown signal received"),
                Err(e) => error!(?e, "failed to wait for shutdown signal"),
            }
        }
    }

    // Cleanup
    info!(state = %state_machine.state(), "shutting down...");

    server.shutdown().await;

    info!("voice-workflow-daemon stopped");

    Ok(())
}
