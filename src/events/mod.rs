//! Events module for session transitions
//!
//! Provides structured event types emitted after each dispatched action:
//! committed transitions, failures, and advisory consistency warnings.

use serde::{Deserialize, Serialize};

use crate::state::{ActionKind, RecordingState, SessionError};

/// Events emitted by the state machine during transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// An action moved the session to its intended target
    Transitioned {
        from: RecordingState,
        to: RecordingState,
        action: ActionKind,
        /// Milliseconds spent in `from` (0 when leaving idle)
        duration_ms: u64,
    },

    /// The session landed in `error`
    Failed {
        from: RecordingState,
        action: ActionKind,
        error: SessionError,
    },

    /// The committed state/data pair looks suspicious
    ConsistencyWarning {
        state: RecordingState,
        warnings: Vec<String>,
    },
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::Transitioned {
                from,
                to,
                action,
                duration_ms,
            } => {
                write!(f, "TRANSITIONED {} -> {} via {} ({}ms)", from, to, action, duration_ms)
            }
            SessionEvent::Failed { from, action, error } => {
                write!(f, "FAILED from {} via {}: {}", from, action, error)
            }
            SessionEvent::ConsistencyWarning { state, warnings } => {
                write!(f, "CONSISTENCY_WARNING in {}: {}", state, warnings.join("; "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::Transitioned {
            from: RecordingState::Recording,
            to: RecordingState::Processing,
            action: ActionKind::StopRecording,
            duration_ms: 1500,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"transitioned\""));
        assert!(json.contains("STOP_RECORDING"));
        assert!(json.contains("1500"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"consistency_warning","state":"idle","warnings":["leftover"]}"#;
        let event: SessionEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            event,
            SessionEvent::ConsistencyWarning { state: RecordingState::Idle, .. }
        ));
    }

    #[test]
    fn test_event_display() {
        let event = SessionEvent::Failed {
            from: RecordingState::Idle,
            action: ActionKind::StartTranscription,
            error: SessionError::reported("boom"),
        };
        assert_eq!(
            event.to_string(),
            "FAILED from idle via START_TRANSCRIPTION: [COLLABORATOR_ERROR] boom"
        );
    }
}
