//! Daemon stop requests: SIGTERM, SIGINT, or an in-process trigger

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::debug;

/// What ended the daemon's main loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Terminate,
    Interrupt,
    /// `ShutdownSignal::trigger` was called
    Requested,
}

/// Resolves once the daemon should stop. Clones share one trigger.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<Notify>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the waiter to stop. Remembered if nobody is waiting yet.
    pub fn trigger(&self) {
        self.requested.notify_one();
    }

    /// Wait for a signal or a trigger
    pub async fn wait(&self) -> Result<ShutdownReason> {
        let mut sigterm =
            signal(SignalKind::terminate()).context("failed to register SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("failed to register SIGINT handler")?;

        let reason = tokio::select! {
            _ = sigterm.recv() => ShutdownReason::Terminate,
            _ = sigint.recv() => ShutdownReason::Interrupt,
            _ = self.requested.notified() => ShutdownReason::Requested,
        };
        debug!(?reason, "shutdown requested");

        Ok(reason)
    }
}
