//! Chat session management
//!
//! This module provides the `ChatSession` abstraction that manages:
//! - The live streaming connection and inbound event dispatch
//! - Turn assembly from partial transcript fragments
//! - Learner utterance recording and fan-out to the live stream
//! - Playback scheduling for the tutor's voice and turn replays
//! - Asynchronous grammar/pronunciation annotation by turn id

mod config;
mod session;
mod stats;
mod turn;

pub use config::ChatConfig;
pub use session::ChatSession;
pub use stats::{ChatStats, ConnectionState};
pub use turn::{CompletedTurn, Speaker, Turn, TurnLedger};
