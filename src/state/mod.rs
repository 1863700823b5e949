//! State machine module for the recording session
//!
//! Provides the transition table, the transition and data validators,
//! and the state machine that applies actions through both:
//! - idle -> recording -> processing -> transcribing -> transcribed
//! - transcribed -> enriching -> complete, or straight to complete
//! - any working state -> error or idle; error -> idle only

mod data;
mod error;
mod machine;
mod table;
mod validate;

pub use data::{AudioHandle, Enrichment, FieldName, SessionData, Transcription};
pub use error::{ErrorCode, SessionError, ValidationError};
pub use machine::{Action, ActionKind, Command, Session, SessionHandle, StateMachine};
pub use table::{is_valid_state, is_valid_transition, RecordingState, UnknownState};
pub use validate::{
    required_fields, validate_consistency, validate_state_data, validate_transition,
    validate_transition_with_data, ConsistencyReport,
};
