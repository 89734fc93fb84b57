use serde::{Deserialize, Serialize};

use crate::audio::{CaptureConfig, PlaybackConfig};

/// Configuration for one chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Unique chat identifier (e.g. "chat-7f9a…")
    pub chat_id: String,

    /// Target language being practiced
    pub language: String,

    /// Learner display name, used in scenario generation
    pub learner_name: String,

    /// Live stream endpoint URL
    pub live_url: String,

    /// Sample rate of captured learner audio (the speech endpoint expects 16kHz)
    pub capture_sample_rate: u32,

    /// Sample rate of inbound tutor voice fragments
    pub playback_sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,

    /// Capture frame size in milliseconds
    pub frame_duration_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            chat_id: format!("chat-{}", uuid::Uuid::new_v4()),
            language: "Italian".to_string(),
            learner_name: "learner".to_string(),
            live_url: "nats://localhost:4222".to_string(),
            capture_sample_rate: 16000,
            playback_sample_rate: 24000,
            channels: 1,
            frame_duration_ms: 100,
        }
    }
}

impl ChatConfig {
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.capture_sample_rate,
            channels: self.channels,
            frame_duration_ms: self.frame_duration_ms,
        }
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            sample_rate: self.playback_sample_rate,
            channels: self.channels,
        }
    }
}
