use serde::{Deserialize, Serialize};

/// Session setup sent once when the live stream opens
///
/// Carries the roleplay persona so the model stays in character for the
/// whole session.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSetupMessage {
    pub session_id: String,
    /// Target language being practiced (e.g. "Italian")
    pub language: String,
    /// Scenario persona / system prompt
    pub system_prompt: String,
    pub timestamp: String, // RFC3339 timestamp
}

/// Audio frame message published to the live stream
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    pub pcm: String, // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String, // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// A complete text turn submitted by the learner
#[derive(Debug, Serialize, Deserialize)]
pub struct TextTurnMessage {
    pub session_id: String,
    pub text: String,
    pub timestamp: String,
}

/// One inbound event from the live endpoint
///
/// Each event carries zero or more of the payload fields; they are applied
/// in arrival order with no reordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveEventMessage {
    pub session_id: String,

    /// Base64-encoded PCM audio fragment of the tutor's voice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,

    /// Partial transcript fragment of the tutor's speech
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutor_transcript: Option<String>,

    /// Partial transcript fragment of the learner's speech
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learner_transcript: Option<String>,

    /// Marks the end of the current exchange; all open turns finalize
    #[serde(default)]
    pub turn_complete: bool,

    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_defaults_for_missing_fields() {
        let json = r#"{"session_id":"chat-1","timestamp":"2026-01-01T00:00:00Z"}"#;
        let event: LiveEventMessage = serde_json::from_str(json).unwrap();

        assert_eq!(event.session_id, "chat-1");
        assert!(event.audio.is_none());
        assert!(event.tutor_transcript.is_none());
        assert!(event.learner_transcript.is_none());
        assert!(!event.turn_complete);
    }

    #[test]
    fn test_event_with_mixed_payloads() {
        let json = r#"{
            "session_id": "chat-1",
            "audio": "AAA=",
            "tutor_transcript": "Ciao!",
            "turn_complete": true,
            "timestamp": "2026-01-01T00:00:00Z"
        }"#;
        let event: LiveEventMessage = serde_json::from_str(json).unwrap();

        assert_eq!(event.audio.as_deref(), Some("AAA="));
        assert_eq!(event.tutor_transcript.as_deref(), Some("Ciao!"));
        assert!(event.learner_transcript.is_none());
        assert!(event.turn_complete);
    }

    #[test]
    fn test_audio_frame_final_field_name() {
        let msg = AudioFrameMessage {
            session_id: "chat-1".into(),
            sequence: 7,
            pcm: "AAECAw==".into(),
            sample_rate: 16000,
            channels: 1,
            timestamp: "2026-01-01T00:00:00Z".into(),
            final_frame: true,
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["final"], true);
        assert!(json.get("final_frame").is_none());
    }
}
