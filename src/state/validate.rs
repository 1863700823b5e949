//! Transition and data validation
//!
//! `validate_transition` checks the edge table, `validate_state_data`
//! checks that the payload holds everything the target state needs, and
//! `validate_consistency` reports suspicious but legal combinations.

use super::data::{FieldName, SessionData};
use super::error::ValidationError;
use super::table::RecordingState;

/// Fields that must be present for a session to be in `state`
pub fn required_fields(state: RecordingState) -> &'static [FieldName] {
    match state {
        RecordingState::Idle | RecordingState::Recording | RecordingState::Error => &[],
        RecordingState::Processing | RecordingState::Transcribing => {
            &[FieldName::Audio, FieldName::AudioDurationMs]
        }
        RecordingState::Transcribed => &[FieldName::Audio, FieldName::Transcription],
        RecordingState::Enriching => &[FieldName::Transcription],
        RecordingState::Complete => &[FieldName::Audio, FieldName::Transcription],
    }
}

/// Rejects `from -> to` when the edge is not in the table
pub fn validate_transition(from: RecordingState, to: RecordingState) -> Result<(), ValidationError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ValidationError::Transition {
            from,
            to,
            allowed: from.next_states().to_vec(),
        })
    }
}

/// Rejects `data` when any field required by `state` is absent
pub fn validate_state_data(state: RecordingState, data: &SessionData) -> Result<(), ValidationError> {
    let missing_fields: Vec<FieldName> = required_fields(state)
        .iter()
        .copied()
        .filter(|field| !data.has(*field))
        .collect();

    if missing_fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Data {
            state,
            missing_fields,
        })
    }
}

/// Edge check first, then the target's data requirements
pub fn validate_transition_with_data(
    from: RecordingState,
    to: RecordingState,
    data: &SessionData,
) -> Result<(), ValidationError> {
    validate_transition(from, to)?;
    validate_state_data(to, data)
}

/// Advisory findings about a state/data pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub warnings: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Flags combinations that pass `validate_state_data` but point at a
/// caller bug. Never fails.
pub fn validate_consistency(state: RecordingState, data: &SessionData) -> ConsistencyReport {
    let mut warnings = Vec::new();

    match state {
        RecordingState::Idle => {
            if !data.is_empty() {
                warnings.push("session data left over in idle state".to_string());
            }
        }
        RecordingState::Recording => {
            if data.audio.is_some() {
                warnings.push("audio present while still recording".to_string());
            }
        }
        RecordingState::Processing
        | RecordingState::Transcribing
        | RecordingState::Transcribed
        | RecordingState::Enriching
        | RecordingState::Complete
        | RecordingState::Error => {}
    }

    if data.enrichment.is_some() && data.transcription.is_none() {
        warnings.push("enrichment present without transcription".to_string());
    }
    if data.transcription.is_some() && data.audio.is_none() {
        warnings.push("transcription present without audio".to_string());
    }
    if matches!(&data.transcription, Some(t) if t.text.trim().is_empty()) {
        warnings.push("transcription text is empty".to_string());
    }
    if matches!(&data.enrichment, Some(e) if e.enriched_text.trim().is_empty()) {
        warnings.push("enrichment text is empty".to_string());
    }
    if data.enrichment.is_some()
        && !matches!(state, RecordingState::Complete | RecordingState::Error)
    {
        warnings.push(format!("enrichment present in {} state", state));
    }

    ConsistencyReport { warnings }
}
