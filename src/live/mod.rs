pub mod client;
pub mod messages;

pub use client::LiveClient;
pub use messages::{AudioFrameMessage, LiveEventMessage, SessionSetupMessage, TextTurnMessage};
