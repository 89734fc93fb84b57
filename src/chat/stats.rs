use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection state of the live stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Failed,
}

/// Statistics about a chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStats {
    /// Live stream connection state
    pub state: ConnectionState,

    /// Whether a recording is currently active
    pub is_recording: bool,

    /// When the chat started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Number of turns recorded so far
    pub turn_count: usize,

    /// Turns carrying at least one annotation
    pub annotated_turn_count: usize,

    /// Audio fragments scheduled for playback so far
    pub playback_fragments: usize,

    /// User-visible status message for non-fatal errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}
