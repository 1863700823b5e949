//! Recording states and the transition table
//!
//! The edge table is fully enumerated: every state lists exactly the
//! states it may move to, and nothing else is reachable.
//!
//! ```text
//! idle         -> recording, error
//! recording    -> processing, error, idle
//! processing   -> transcribing, error, idle
//! transcribing -> transcribed, error, idle
//! transcribed  -> enriching, complete, error, idle
//! enriching    -> complete, error, idle
//! complete     -> idle, error
//! error        -> idle
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The eight states of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// Waiting for the user to start recording
    Idle,
    /// Microphone is capturing
    Recording,
    /// Captured audio is being prepared for transcription
    Processing,
    /// A transcription provider is working on the audio
    Transcribing,
    /// Transcription text is available
    Transcribed,
    /// An enrichment provider is rewriting the transcription
    Enriching,
    /// The session finished, with or without enrichment
    Complete,
    /// Something failed; only a reset leaves this state
    Error,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

impl RecordingState {
    /// Every state, in workflow order
    pub const ALL: [RecordingState; 8] = [
        RecordingState::Idle,
        RecordingState::Recording,
        RecordingState::Processing,
        RecordingState::Transcribing,
        RecordingState::Transcribed,
        RecordingState::Enriching,
        RecordingState::Complete,
        RecordingState::Error,
    ];

    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
            RecordingState::Processing => "processing",
            RecordingState::Transcribing => "transcribing",
            RecordingState::Transcribed => "transcribed",
            RecordingState::Enriching => "enriching",
            RecordingState::Complete => "complete",
            RecordingState::Error => "error",
        }
    }

    /// States reachable in one step from `self`
    pub fn next_states(&self) -> &'static [RecordingState] {
        use RecordingState::*;
        match self {
            Idle => &[Recording, Error],
            Recording => &[Processing, Error, Idle],
            Processing => &[Transcribing, Error, Idle],
            Transcribing => &[Transcribed, Error, Idle],
            Transcribed => &[Enriching, Complete, Error, Idle],
            Enriching => &[Complete, Error, Idle],
            Complete => &[Idle, Error],
            Error => &[Idle],
        }
    }

    /// Returns whether the edge `self -> target` exists in the table
    pub fn can_transition_to(&self, target: RecordingState) -> bool {
        self.next_states().contains(&target)
    }

    /// Recording or waiting on a provider
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            RecordingState::Recording
                | RecordingState::Processing
                | RecordingState::Transcribing
                | RecordingState::Enriching
        )
    }

    /// Resting states where no work is outstanding
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecordingState::Idle | RecordingState::Complete | RecordingState::Error
        )
    }

    /// States in which the user is expected to act next
    pub fn is_interactive(&self) -> bool {
        matches!(
            self,
            RecordingState::Idle
                | RecordingState::Recording
                | RecordingState::Transcribed
                | RecordingState::Complete
                | RecordingState::Error
        )
    }

    /// Status text for the UI. Not used for control flow.
    pub fn describe(&self) -> &'static str {
        match self {
            RecordingState::Idle => "Ready to record",
            RecordingState::Recording => "Recording...",
            RecordingState::Processing => "Processing audio...",
            RecordingState::Transcribing => "Transcribing...",
            RecordingState::Transcribed => "Transcription ready",
            RecordingState::Enriching => "Enhancing text...",
            RecordingState::Complete => "Done",
            RecordingState::Error => "Something went wrong",
        }
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected state name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown recording state: {0:?}")]
pub struct UnknownState(pub String);

impl FromStr for RecordingState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordingState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

/// Membership check for state names coming from outside the process
pub fn is_valid_state(name: &str) -> bool {
    name.parse::<RecordingState>().is_ok()
}

/// Returns whether `from -> to` is a legal edge
pub fn is_valid_transition(from: RecordingState, to: RecordingState) -> bool {
    from.can_transition_to(to)
}

/// Formats a set of states as `a, b, c`
pub(crate) fn join_states(states: &[RecordingState]) -> String {
    states
        .iter()
        .map(RecordingState::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(RecordingState::default(), RecordingState::Idle);
    }

    #[test]
    fn test_every_state_has_next_states() {
        for state in RecordingState::ALL {
            assert!(!state.next_states().is_empty(), "{} has no edges", state);
        }
    }

    #[test]
    fn test_every_state_but_error_reaches_error() {
        for state in RecordingState::ALL {
            let reaches_error = state.can_transition_to(RecordingState::Error);
            assert_eq!(reaches_error, state != RecordingState::Error, "{}", state);
        }
    }

    #[test]
    fn test_error_only_leads_to_idle() {
        assert_eq!(RecordingState::Error.next_states(), &[RecordingState::Idle]);
    }

    #[test]
    fn test_every_state_returns_to_idle_within_two_steps() {
        for state in RecordingState::ALL {
            if state == RecordingState::Idle {
                continue;
            }
            let direct = state.can_transition_to(RecordingState::Idle);
            let via_error = state.can_transition_to(RecordingState::Error)
                && RecordingState::Error.can_transition_to(RecordingState::Idle);
            assert!(direct || via_error, "{} cannot get back to idle", state);
        }
    }

    #[test]
    fn test_no_self_edges() {
        for state in RecordingState::ALL {
            assert!(!state.can_transition_to(state), "{} -> {}", state, state);
        }
    }

    #[test]
    fn test_edge_count() {
        let count: usize = RecordingState::ALL
            .iter()
            .map(|s| s.next_states().len())
            .sum();
        assert_eq!(count, 21);
    }

    #[test]
    fn test_transcribed_forks() {
        assert!(is_valid_transition(RecordingState::Transcribed, RecordingState::Enriching));
        assert!(is_valid_transition(RecordingState::Transcribed, RecordingState::Complete));
    }

    #[test]
    fn test_invalid_jumps() {
        assert!(!is_valid_transition(RecordingState::Idle, RecordingState::Transcribing));
        assert!(!is_valid_transition(RecordingState::Complete, RecordingState::Complete));
        assert!(!is_valid_transition(RecordingState::Error, RecordingState::Recording));
        assert!(!is_valid_transition(RecordingState::Processing, RecordingState::Recording));
    }

    #[test]
    fn test_subsets() {
        use RecordingState::*;
        let in_progress: Vec<_> = RecordingState::ALL.into_iter().filter(|s| s.is_in_progress()).collect();
        assert_eq!(in_progress, vec![Recording, Processing, Transcribing, Enriching]);

        let terminal: Vec<_> = RecordingState::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![Idle, Complete, Error]);

        let interactive: Vec<_> = RecordingState::ALL.into_iter().filter(|s| s.is_interactive()).collect();
        assert_eq!(interactive, vec![Idle, Recording, Transcribed, Complete, Error]);
    }

    #[test]
    fn test_parse_and_membership() {
        for state in RecordingState::ALL {
            assert_eq!(state.as_str().parse::<RecordingState>(), Ok(state));
        }
        assert!(is_valid_state("enriching"));
        assert!(!is_valid_state("paused"));
        assert!(!is_valid_state("Idle"));
        assert_eq!(
            "bogus".parse::<RecordingState>(),
            Err(UnknownState("bogus".to_string()))
        );
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&RecordingState::Transcribed).unwrap();
        assert_eq!(json, "\"transcribed\"");
        let state: RecordingState = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(state, RecordingState::Error);
        assert!(serde_json::from_str::<RecordingState>("\"paused\"").is_err());
    }

    #[test]
    fn test_describe_is_distinct() {
        let mut labels: Vec<_> = RecordingState::ALL.iter().map(|s| s.describe()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 8);
    }

    #[test]
    fn test_join_states() {
        assert_eq!(join_states(RecordingState::Idle.next_states()), "recording, error");
    }
}
