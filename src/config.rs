//! Configuration loading and management

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,

    /// Capacity of the action queue feeding the state machine
    pub command_buffer: usize,

    /// Capacity of the session event broadcast channel
    pub event_buffer: usize,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os("VOICE_WORKFLOW_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = std::env::var("HOME").context("HOME is not set")?;
                PathBuf::from(&home)
                    .join(".local")
                    .join("share")
                    .join("voice-workflow")
            }
        };

        let socket_path = std::env::var_os("VOICE_WORKFLOW_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let log_filter =
            std::env::var("VOICE_WORKFLOW_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            socket_path,
            data_dir,
            log_filter,
            command_buffer: 32,
            event_buffer: 64,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}
