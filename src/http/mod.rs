//! HTTP API server for the browser UI
//!
//! This module provides a REST API for driving chat sessions:
//! - POST /chats/start - Generate a scenario and open a chat
//! - POST /chats/:id/text - Submit a learner text turn
//! - POST /chats/:id/record/start|stop - Control utterance recording
//! - POST /chats/:id/audio - Push one captured microphone frame
//! - POST /chats/:id/replay/:turn_id - Replay a finalized turn
//! - GET /chats/:id/transcript - Ordered annotated turns
//! - GET /chats/:id/status - Session statistics
//! - POST /chats/:id/end - Tear the session down
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
