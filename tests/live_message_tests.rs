// Wire format of the live stream messages

use base64::Engine;
use lingua_live::audio::{le_bytes_to_samples, samples_to_le_bytes};
use lingua_live::{AudioFrameMessage, LiveEventMessage, TextTurnMessage};

#[test]
fn test_audio_frame_pcm_round_trips_through_base64() {
    let samples = vec![0i16, 512, -512, 32767, -32768];
    let encoded = base64::engine::general_purpose::STANDARD.encode(samples_to_le_bytes(&samples));

    let msg = AudioFrameMessage {
        session_id: "chat-42".to_string(),
        sequence: 3,
        pcm: encoded,
        sample_rate: 16000,
        channels: 1,
        timestamp: "2026-08-06T10:00:00Z".to_string(),
        final_frame: false,
    };

    let json = serde_json::to_string(&msg).unwrap();
    let parsed: AudioFrameMessage = serde_json::from_str(&json).unwrap();

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&parsed.pcm)
        .unwrap();
    assert_eq!(le_bytes_to_samples(&bytes), samples);
}

#[test]
fn test_event_payload_fields_are_optional() {
    // A bare turn-complete marker
    let json = r#"{
        "session_id": "chat-42",
        "turn_complete": true,
        "timestamp": "2026-08-06T10:00:01Z"
    }"#;

    let event: LiveEventMessage = serde_json::from_str(json).unwrap();
    assert!(event.turn_complete);
    assert!(event.audio.is_none());
    assert!(event.tutor_transcript.is_none());
    assert!(event.learner_transcript.is_none());
}

#[test]
fn test_event_can_carry_audio_and_transcript_together() {
    let json = r#"{
        "session_id": "chat-42",
        "audio": "AAABAA==",
        "tutor_transcript": "Bonjour",
        "timestamp": "2026-08-06T10:00:02Z"
    }"#;

    let event: LiveEventMessage = serde_json::from_str(json).unwrap();
    assert!(event.audio.is_some());
    assert_eq!(event.tutor_transcript.as_deref(), Some("Bonjour"));
    assert!(!event.turn_complete);
}

#[test]
fn test_text_turn_serializes_flat() {
    let msg = TextTurnMessage {
        session_id: "chat-42".to_string(),
        text: "Je voudrais un croissant".to_string(),
        timestamp: "2026-08-06T10:00:03Z".to_string(),
    };

    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["session_id"], "chat-42");
    assert_eq!(json["text"], "Je voudrais un croissant");
}
