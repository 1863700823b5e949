//! Validation failures and the error record attached to a session

use std::fmt;

use serde::{Deserialize, Serialize};

use super::data::FieldName;
use super::table::{join_states, RecordingState};

/// Why a proposed transition was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The edge is not in the transition table
    #[error(
        "Invalid state transition from {from} to {to}. Allowed: {}",
        join_states(.allowed)
    )]
    Transition {
        from: RecordingState,
        to: RecordingState,
        allowed: Vec<RecordingState>,
    },

    /// The edge is legal but the payload lacks fields the target requires
    #[error(
        "State {state} is missing required data: {}",
        join_fields(.missing_fields)
    )]
    Data {
        state: RecordingState,
        missing_fields: Vec<FieldName>,
    },
}

impl ValidationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ValidationError::Transition { .. } => ErrorCode::StateTransitionError,
            ValidationError::Data { .. } => ErrorCode::StateDataValidationError,
        }
    }
}

fn join_fields(fields: &[FieldName]) -> String {
    fields
        .iter()
        .map(FieldName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Machine-readable cause of a session failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Rejected by the transition table
    StateTransitionError,
    /// Rejected by the data validator
    StateDataValidationError,
    /// Reported by a collaborator through `SET_ERROR`
    CollaboratorError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::StateTransitionError => write!(f, "STATE_TRANSITION_ERROR"),
            ErrorCode::StateDataValidationError => write!(f, "STATE_DATA_VALIDATION_ERROR"),
            ErrorCode::CollaboratorError => write!(f, "COLLABORATOR_ERROR"),
        }
    }
}

/// Structured cause stored on a session that landed in `error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<FieldName>,
}

impl SessionError {
    /// Error reported by a transcription/enrichment/capture collaborator
    pub fn reported(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::CollaboratorError,
            message: message.into(),
            missing_fields: Vec::new(),
        }
    }
}

impl From<ValidationError> for SessionError {
    fn from(err: ValidationError) -> Self {
        let code = err.code();
        let message = err.to_string();
        let missing_fields = match err {
            ValidationError::Data { missing_fields, .. } => missing_fields,
            ValidationError::Transition { .. } => Vec::new(),
        };
        Self {
            code,
            message,
            missing_fields,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_display() {
        let err = ValidationError::Transition {
            from: RecordingState::Idle,
            to: RecordingState::Transcribing,
            allowed: RecordingState::Idle.next_states().to_vec(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from idle to transcribing. Allowed: recording, error"
        );
        assert_eq!(err.code(), ErrorCode::StateTransitionError);
    }

    #[test]
    fn test_data_error_display() {
        let err = ValidationError::Data {
            state: RecordingState::Processing,
            missing_fields: vec![FieldName::Audio, FieldName::AudioDurationMs],
        };
        assert_eq!(
            err.to_string(),
            "State processing is missing required data: audio, audioDurationMs"
        );
        assert_eq!(err.code(), ErrorCode::StateDataValidationError);
    }

    #[test]
    fn test_session_error_from_data_error_keeps_fields() {
        let err = ValidationError::Data {
            state: RecordingState::Transcribed,
            missing_fields: vec![FieldName::Transcription],
        };
        let session_err = SessionError::from(err);
        assert_eq!(session_err.code, ErrorCode::StateDataValidationError);
        assert_eq!(session_err.missing_fields, vec![FieldName::Transcription]);
        assert!(session_err.message.contains("transcription"));
    }

    #[test]
    fn test_session_error_from_transition_error_has_no_fields() {
        let err = ValidationError::Transition {
            from: RecordingState::Error,
            to: RecordingState::Recording,
            allowed: vec![RecordingState::Idle],
        };
        let session_err = SessionError::from(err);
        assert_eq!(session_err.code, ErrorCode::StateTransitionError);
        assert!(session_err.missing_fields.is_empty());
    }

    #[test]
    fn test_session_error_json() {
        let session_err = SessionError {
            code: ErrorCode::StateDataValidationError,
            message: "missing".to_string(),
            missing_fields: vec![FieldName::Audio],
        };
        let json = serde_json::to_value(&session_err).unwrap();
        assert_eq!(json["code"], "STATE_DATA_VALIDATION_ERROR");
        assert_eq!(json["missingFields"][0], "audio");

        let reported = serde_json::to_value(SessionError::reported("network down")).unwrap();
        assert_eq!(reported["code"], "COLLABORATOR_ERROR");
        assert!(reported.get("missingFields").is_none());
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::reported("timeout");
        assert_eq!(err.to_string(), "[COLLABORATOR_ERROR] timeout");
    }
}
