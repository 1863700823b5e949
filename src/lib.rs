//! voice-workflow: recording session control for a voice-capture app
//!
//! The `state` module holds the session state machine: the transition
//! table, the transition and data validators, and the state machine that
//! applies actions through both. It performs no I/O; capture and
//! transcription/enrichment providers report back by dispatching actions.
//!
//! The remaining modules host that state machine in a daemon: session
//! events, a Unix socket IPC server, configuration, and shutdown handling.

pub mod config;
pub mod events;
pub mod ipc;
pub mod lifecycle;
pub mod state;
