//! Core state machine implementation
//!
//! `StateMachine::dispatch` is the only way to change a session. Each
//! action names a target state and carries the payload that state needs.
//! The transition table is checked first, then the action's own payload,
//! then the target's data requirements on the merged data. The
//! session either moves to the target or lands in `error` with a
//! structured cause. Dispatch never fails from the caller's side.

use std::time::Instant;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use super::data::{AudioHandle, Enrichment, FieldName, SessionData, Transcription};
use super::error::{SessionError, ValidationError};
use super::table::RecordingState;
use super::validate::{validate_consistency, validate_state_data, validate_transition};
use crate::events::SessionEvent;

/// Operations accepted by the state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    StartRecording,
    StopRecording {
        audio: Option<AudioHandle>,
        #[serde(rename = "durationMs")]
        duration_ms: Option<u64>,
    },
    StartTranscription,
    TranscriptionComplete {
        transcription: Option<Transcription>,
    },
    StartEnrichment,
    EnrichmentComplete {
        enrichment: Option<Enrichment>,
    },
    FinishWithoutEnrichment,
    ResetRecording,
    SetError {
        #[serde(default = "default_error_message")]
        message: String,
    },
    /// Retry after an error
    ClearError,
}

fn default_error_message() -> String {
    "unspecified error".to_string()
}

/// Payload-free tag of an [`Action`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    StartRecording,
    StopRecording,
    StartTranscription,
    TranscriptionComplete,
    StartEnrichment,
    EnrichmentComplete,
    FinishWithoutEnrichment,
    ResetRecording,
    SetError,
    ClearError,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActionKind::StartRecording => "START_RECORDING",
            ActionKind::StopRecording => "STOP_RECORDING",
            ActionKind::StartTranscription => "START_TRANSCRIPTION",
            ActionKind::TranscriptionComplete => "TRANSCRIPTION_COMPLETE",
            ActionKind::StartEnrichment => "START_ENRICHMENT",
            ActionKind::EnrichmentComplete => "ENRICHMENT_COMPLETE",
            ActionKind::FinishWithoutEnrichment => "FINISH_WITHOUT_ENRICHMENT",
            ActionKind::ResetRecording => "RESET_RECORDING",
            ActionKind::SetError => "SET_ERROR",
            ActionKind::ClearError => "CLEAR_ERROR",
        };
        f.write_str(name)
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::StartRecording => ActionKind::StartRecording,
            Action::StopRecording { .. } => ActionKind::StopRecording,
            Action::StartTranscription => ActionKind::StartTranscription,
            Action::TranscriptionComplete { .. } => ActionKind::TranscriptionComplete,
            Action::StartEnrichment => ActionKind::StartEnrichment,
            Action::EnrichmentComplete { .. } => ActionKind::EnrichmentComplete,
            Action::FinishWithoutEnrichment => ActionKind::FinishWithoutEnrichment,
            Action::ResetRecording => ActionKind::ResetRecording,
            Action::SetError { .. } => ActionKind::SetError,
            Action::ClearError => ActionKind::ClearError,
        }
    }

    /// State this action attempts to move the session to
    pub fn target(&self) -> RecordingState {
        match self {
            Action::StartRecording => RecordingState::Recording,
            Action::StopRecording { .. } => RecordingState::Processing,
            Action::StartTranscription => RecordingState::Transcribing,
            Action::TranscriptionComplete { .. } => RecordingState::Transcribed,
            Action::StartEnrichment => RecordingState::Enriching,
            Action::EnrichmentComplete { .. } | Action::FinishWithoutEnrichment => {
                RecordingState::Complete
            }
            Action::ResetRecording | Action::ClearError => RecordingState::Idle,
            Action::SetError { .. } => RecordingState::Error,
        }
    }

    /// Fields this action must carry itself, whatever the session holds
    fn missing_payload(&self) -> Vec<FieldName> {
        let mut missing = Vec::new();
        match self {
            Action::StopRecording { audio, duration_ms } => {
                if audio.is_none() {
                    missing.push(FieldName::Audio);
                }
                if duration_ms.is_none() {
                    missing.push(FieldName::AudioDurationMs);
                }
            }
            Action::TranscriptionComplete { transcription: None } => {
                missing.push(FieldName::Transcription)
            }
            Action::EnrichmentComplete { enrichment: None } => missing.push(FieldName::Enrichment),
            _ => {}
        }
        missing
    }

    /// Rejects an action that lacks its own payload
    fn validate_payload(&self) -> Result<(), ValidationError> {
        let missing_fields = self.missing_payload();
        if missing_fields.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Data {
                state: self.target(),
                missing_fields,
            })
        }
    }

    /// Writes this action's payload over `current`. Returning to idle
    /// discards everything.
    fn merge_into(&self, current: &SessionData) -> SessionData {
        match self {
            Action::ResetRecording | Action::ClearError => SessionData::default(),
            Action::StopRecording { audio, duration_ms } => SessionData {
                audio: audio.clone(),
                audio_duration_ms: *duration_ms,
                ..current.clone()
            },
            Action::TranscriptionComplete { transcription } => SessionData {
                transcription: transcription.clone(),
                ..current.clone()
            },
            Action::EnrichmentComplete { enrichment } => SessionData {
                enrichment: enrichment.clone(),
                ..current.clone()
            },
            Action::StartRecording
            | Action::StartTranscription
            | Action::StartEnrichment
            | Action::FinishWithoutEnrichment
            | Action::SetError { .. } => current.clone(),
        }
    }
}

/// Snapshot of a session handed to readers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub state: RecordingState,
    pub data: SessionData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionError>,
}

impl Session {
    /// Recording or waiting on a provider
    pub fn is_busy(&self) -> bool {
        self.state.is_in_progress()
    }

    pub fn next_states(&self) -> &'static [RecordingState] {
        self.state.next_states()
    }

    pub fn describe(&self) -> &'static str {
        self.state.describe()
    }
}

/// Requests accepted by [`StateMachine::run`]
#[derive(Debug)]
pub enum Command {
    /// Apply an action; the resulting session is sent back when `reply` is set
    Dispatch {
        action: Action,
        reply: Option<oneshot::Sender<Session>>,
    },
    /// Read the current session
    Snapshot { reply: oneshot::Sender<Session> },
}

/// The state machine that owns the single recording session
pub struct StateMachine {
    /// Current session
    session: Session,
    /// Time when the current non-idle state was entered
    state_entered_at: Option<Instant>,
    /// Channel for emitting session events
    event_tx: broadcast::Sender<SessionEvent>,
}

impl StateMachine {
    /// Create a new state machine in `idle` with empty data
    pub fn new(event_tx: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            session: Session::default(),
            state_entered_at: None,
            event_tx,
        }
    }

    /// Get the current session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Get the current state
    pub fn state(&self) -> RecordingState {
        self.session.state
    }

    /// Apply `action` and return the resulting session.
    ///
    /// The result is always either the action's target or `error`.
    pub fn dispatch(&mut self, action: Action) -> Session {
        let from = self.session.state;
        let to = action.target();
        let kind = action.kind();
        let candidate = action.merge_into(&self.session.data);

        debug!(action = %kind, from = %from, to = %to, "dispatching action");

        // Edge first, then the action's own payload, then the target's needs.
        let verdict = validate_transition(from, to)
            .and_then(|()| action.validate_payload())
            .and_then(|()| validate_state_data(to, &candidate));

        match verdict {
            Ok(()) => {
                let error = match action {
                    Action::SetError { message } => Some(SessionError::reported(message)),
                    _ => None,
                };
                self.commit(kind, to, candidate, error);
            }
            Err(err) => {
                warn!(
                    action = %kind,
                    from = %from,
                    to = %to,
                    code = %err.code(),
                    error = %err,
                    "dispatch rejected"
                );
                // The rejected payload is not applied; data gathered so far stays
                // until the session is reset.
                let data = self.session.data.clone();
                self.commit(kind, RecordingState::Error, data, Some(err.into()));
            }
        }

        self.session.clone()
    }

    /// Run the state machine, processing commands until every sender is gone
    pub async fn run(&mut self, mut command_rx: mpsc::Receiver<Command>) {
        info!(state = %self.session.state, "state machine started");

        while let Some(command) = command_rx.recv().await {
            match command {
                Command::Dispatch { action, reply } => {
                    let session = self.dispatch(action);
                    if let Some(reply) = reply {
                        let _ = reply.send(session);
                    }
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.session.clone());
                }
            }
        }

        info!("state machine stopped");
    }

    /// Replace the session and emit the matching events
    fn commit(
        &mut self,
        kind: ActionKind,
        to: RecordingState,
        data: SessionData,
        error: Option<SessionError>,
    ) {
        let from = self.session.state;
        let duration_ms = self
            .state_entered_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        self.session = Session {
            state: to,
            data,
            error,
        };
        self.state_entered_at = if to != RecordingState::Idle {
            Some(Instant::now())
        } else {
            None
        };

        let event = match &self.session.error {
            Some(error) => SessionEvent::Failed {
                from,
                action: kind,
                error: error.clone(),
            },
            None => {
                info!(
                    from = %from,
                    to = %to,
                    action = %kind,
                    duration_ms = duration_ms,
                    "state transition"
                );
                SessionEvent::Transitioned {
                    from,
                    to,
                    action: kind,
                    duration_ms,
                }
            }
        };
        self.emit(event);

        let report = validate_consistency(self.session.state, &self.session.data);
        if !report.is_clean() {
            warn!(state = %to, warnings = ?report.warnings, "session data looks inconsistent");
            self.emit(SessionEvent::ConsistencyWarning {
                state: to,
                warnings: report.warnings,
            });
        }
    }

    fn emit(&self, event: SessionEvent) {
        debug!(%event, "emitting session event");
        let _ = self.event_tx.send(event);
    }
}

/// Cloneable handle for talking to a running [`StateMachine`]
#[derive(Debug, Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub fn new(command_tx: mpsc::Sender<Command>) -> Self {
        Self { command_tx }
    }

    /// Apply an action and wait for the resulting session
    pub async fn dispatch(&self, action: Action) -> Result<Session> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::Dispatch {
                action,
                reply: Some(reply),
            })
            .await
            .map_err(|_| anyhow!("state machine is not running"))?;
        rx.await.map_err(|_| anyhow!("state machine dropped the reply"))
    }

    /// Read the current session
    pub async fn snapshot(&self) -> Result<Session> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| anyhow!("state machine is not running"))?;
        rx.await.map_err(|_| anyhow!("state machine dropped the reply"))
    }
}
