pub mod audio;
pub mod chat;
pub mod config;
pub mod http;
pub mod live;
pub mod services;

pub use audio::{
    AudioBackend, AudioFile, AudioFrame, CaptureConfig, FileBackend, PlaybackConfig,
    PlaybackScheduler, PushBackend, RecordedUtterance, ScheduledFragment, UtteranceRecorder,
};
pub use chat::{ChatConfig, ChatSession, ChatStats, ConnectionState, Speaker, Turn, TurnLedger};
pub use config::Config;
pub use http::{create_router, AppState};
pub use live::{AudioFrameMessage, LiveClient, LiveEventMessage, TextTurnMessage};
pub use services::{
    fallback_scenario, GeminiClient, GrammarVerdict, PronunciationReport, Scenario, ServiceSet,
};
