//! Session payload carried alongside the recording state

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque reference to captured audio (a file path or buffer id owned by
/// the capture collaborator)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioHandle(pub String);

impl AudioHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Output of a transcription provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    /// Provider-specific fields (language, segments, model name...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transcription {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            extra: Map::new(),
        }
    }
}

/// Output of an enrichment provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    pub enriched_text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Enrichment {
    pub fn new(enriched_text: impl Into<String>) -> Self {
        Self {
            enriched_text: enriched_text.into(),
            extra: Map::new(),
        }
    }
}

/// Data accumulated by a session as it moves through the workflow.
///
/// Starts empty in `idle`, only gains fields while the session advances and
/// is cleared as a whole when the session returns to `idle`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub audio: Option<AudioHandle>,
    pub audio_duration_ms: Option<u64>,
    pub transcription: Option<Transcription>,
    pub enrichment: Option<Enrichment>,
}

impl SessionData {
    pub fn is_empty(&self) -> bool {
        self.audio.is_none()
            && self.audio_duration_ms.is_none()
            && self.transcription.is_none()
            && self.enrichment.is_none()
    }

    /// Returns whether the named field holds a value
    pub fn has(&self, field: FieldName) -> bool {
        match field {
            FieldName::Audio => self.audio.is_some(),
            FieldName::AudioDurationMs => self.audio_duration_ms.is_some(),
            FieldName::Transcription => self.transcription.is_some(),
            FieldName::Enrichment => self.enrichment.is_some(),
        }
    }
}

/// Names of the `SessionData` fields, as reported in validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    Audio,
    AudioDurationMs,
    Transcription,
    Enrichment,
}

impl FieldName {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Audio => "audio",
            FieldName::AudioDurationMs => "audioDurationMs",
            FieldName::Transcription => "transcription",
            FieldName::Enrichment => "enrichment",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let data = SessionData::default();
        assert!(data.is_empty());
        assert!(!data.has(FieldName::Audio));
    }

    #[test]
    fn test_has_reports_present_fields() {
        let data = SessionData {
            audio: Some(AudioHandle::new("clip-1")),
            audio_duration_ms: Some(0),
            ..Default::default()
        };
        assert!(data.has(FieldName::Audio));
        // Zero is still a value.
        assert!(data.has(FieldName::AudioDurationMs));
        assert!(!data.has(FieldName::Transcription));
        assert!(!data.is_empty());
    }

    #[test]
    fn test_session_data_json_shape() {
        let data = SessionData {
            audio: Some(AudioHandle::new("/tmp/a.wav")),
            audio_duration_ms: Some(5000),
            transcription: Some(Transcription::new("hello")),
            enrichment: Some(Enrichment::new("Hello.")),
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["audio"], "/tmp/a.wav");
        assert_eq!(json["audioDurationMs"], 5000);
        assert_eq!(json["transcription"]["text"], "hello");
        assert_eq!(json["enrichment"]["enrichedText"], "Hello.");
    }

    #[test]
    fn test_transcription_keeps_extra_fields() {
        let json = r#"{"text":"hi","language":"en","confidence":0.9}"#;
        let t: Transcription = serde_json::from_str(json).unwrap();
        assert_eq!(t.text, "hi");
        assert_eq!(t.extra["language"], "en");

        let back = serde_json::to_value(&t).unwrap();
        assert_eq!(back["confidence"], 0.9);
    }

    #[test]
    fn test_enrichment_requires_enriched_text() {
        let result: Result<Enrichment, _> = serde_json::from_str(r#"{"style":"formal"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_field_names() {
        assert_eq!(FieldName::AudioDurationMs.to_string(), "audioDurationMs");
        let json = serde_json::to_string(&FieldName::AudioDurationMs).unwrap();
        assert_eq!(json, "\"audioDurationMs\"");
    }
}
