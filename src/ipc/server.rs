//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications of
//! session events to subscribed clients.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::events::SessionEvent;
use crate::state::SessionHandle;

use super::protocol::{read_frame, write_message, DaemonStatus, Request, Response};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    shared: Shared,
    shutdown_tx: broadcast::Sender<()>,
}

/// Pause after the `failures`-th consecutive accept error
fn accept_backoff(failures: u32) -> Duration {
    let ms = 50u64.saturating_mul(1 << failures.min(6));
    Duration::from_millis(ms.min(2_000))
}

/// What every client handler needs
#[derive(Clone)]
struct Shared {
    session: SessionHandle,
    events: broadcast::Sender<SessionEvent>,
    start_time: Instant,
}

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(
        socket_path: &Path,
        session: SessionHandle,
        events: broadcast::Sender<SessionEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Owner-only access
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))
                .context("failed to set socket permissions")?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            shared: Shared {
                session,
                events,
                start_time: Instant::now(),
            },
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let mut accept_failures = 0u32;
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    accept_failures = 0;
                    debug!("client connected");
                    let shared = self.shared.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    let delay = accept_backoff(accept_failures);
                    accept_failures = accept_failures.saturating_add(1);
                    error!(?e, delay_ms = delay.as_millis() as u64, "accept error");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(stream: UnixStream, shared: Shared) -> Result<()> {
        let (mut reader, writer) = stream.into_split();
        let (out_tx, out_rx) = mpsc::channel::<Response>(32);
        let writer_task = tokio::spawn(Self::write_loop(writer, out_rx));
        let mut forwarder: Option<JoinHandle<()>> = None;

        let result: Result<()> = async {
            loop {
                let Some(frame) = read_frame(&mut reader).await? else {
                    debug!("client disconnected");
                    return Ok(());
                };

                let response = match serde_json::from_slice::<Request>(&frame) {
                    Ok(request) => {
                        debug!(?request, "received request");
                        let (response, subscribe) = Self::process_request(request, &shared).await;
                        if subscribe && forwarder.is_none() {
                            forwarder = Some(Self::forward_events(&shared, out_tx.clone()));
                            debug!("client subscribed to notifications");
                        }
                        response
                    }
                    Err(e) => {
                        warn!(?e, "failed to parse request");
                        Response::error("invalid_request", e.to_string())
                    }
                };

                if out_tx.send(response).await.is_err() {
                    return Ok(());
                }
            }
        }
        .await;

        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
        drop(out_tx);
        if let Ok(Err(e)) = writer_task.await {
            debug!(?e, "client writer stopped");
        }

        result
    }

    /// Push session events to a subscribed client
    fn forward_events(shared: &Shared, out_tx: mpsc::Sender<Response>) -> JoinHandle<()> {
        let mut event_rx = shared.events.subscribe();
        tokio::spawn(async move {
            loop {
                match event_rx.recv().await {
                    Ok(event) => {
                        if out_tx.send(Response::Notification { event }).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber lagged behind session events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Serialize queued responses onto the socket
    async fn write_loop(mut writer: OwnedWriteHalf, mut out_rx: mpsc::Receiver<Response>) -> Result<()> {
        while let Some(response) = out_rx.recv().await {
            write_message(&mut writer, &response).await?;
        }
        Ok(())
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(request: Request, shared: &Shared) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => match shared.session.snapshot().await {
                Ok(session) => {
                    let uptime_secs = shared.start_time.elapsed().as_secs();
                    (Response::Status(DaemonStatus::new(session, uptime_secs)), false)
                }
                Err(e) => (Response::error("unavailable", e.to_string()), false),
            },

            Request::Dispatch { action } => match shared.session.dispatch(action).await {
                Ok(session) => (Response::Session(session), false),
                Err(e) => (Response::error("unavailable", e.to_string()), false),
            },

            Request::NextStates => match shared.session.snapshot().await {
                Ok(session) => (
                    Response::NextStates {
                        state: session.state,
                        states: session.next_states().to_vec(),
                        description: session.describe().to_string(),
                    },
                    false,
                ),
                Err(e) => (Response::error("unavailable", e.to_string()), false),
            },

            Request::Subscribe => (Response::Subscribed, true),
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}
