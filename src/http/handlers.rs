use super::state::AppState;
use crate::audio::le_bytes_to_samples;
use crate::chat::{ChatConfig, ChatSession, ChatStats, Turn};
use crate::services::{generate_or_fallback, Scenario, ScenarioRequest};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartChatRequest {
    /// Target language to practice (e.g. "Italian")
    pub language: String,

    /// Learner display name, woven into the scenario
    pub learner_name: String,

    /// Optional chat ID (if not provided, generate UUID)
    pub chat_id: Option<String>,

    /// Description of the previous scenario, to avoid repeats
    pub avoid_scenario: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartChatResponse {
    pub chat_id: String,
    pub scenario: Scenario,
    pub stats: ChatStats,
}

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SendTextResponse {
    pub turn_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PushAudioRequest {
    /// Base64-encoded 16-bit little-endian PCM samples
    pub pcm: String,
}

#[derive(Debug, Serialize)]
pub struct ReplayResponse {
    /// False when there was nothing to play (synthesis declined)
    pub playing: bool,
}

#[derive(Debug, Serialize)]
pub struct EndChatResponse {
    pub chat_id: String,
    pub status: String,
    pub stats: ChatStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

async fn find_chat(state: &AppState, chat_id: &str) -> Option<Arc<ChatSession>> {
    let chats = state.chats.read().await;
    chats.get(chat_id).cloned()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /chats/start
/// Generate a scenario and open a new chat session
pub async fn start_chat(
    State(state): State<AppState>,
    Json(req): Json<StartChatRequest>,
) -> impl IntoResponse {
    let chat_id = req
        .chat_id
        .unwrap_or_else(|| format!("chat-{}", uuid::Uuid::new_v4()));

    info!("Starting chat {} ({})", chat_id, req.language);

    // Check if already active
    {
        let chats = state.chats.read().await;
        if chats.contains_key(&chat_id) {
            return error_response(
                StatusCode::CONFLICT,
                format!("Chat {} is already active", chat_id),
            );
        }
    }

    // Scenario generation never blocks the chat; failures fall back
    let scenario_request = ScenarioRequest {
        language: req.language.clone(),
        learner_name: req.learner_name.clone(),
        avoid: req.avoid_scenario,
    };
    let scenario =
        generate_or_fallback(&*state.services.scenarios, &scenario_request).await;

    let config = ChatConfig {
        chat_id: chat_id.clone(),
        language: req.language,
        learner_name: req.learner_name,
        live_url: state.config.live.url.clone(),
        capture_sample_rate: state.config.audio.capture_sample_rate,
        playback_sample_rate: state.config.audio.playback_sample_rate,
        channels: state.config.audio.channels,
        frame_duration_ms: state.config.audio.frame_duration_ms,
    };

    let session = Arc::new(
        ChatSession::open(config, scenario.clone(), state.services.clone()).await,
    );
    let stats = session.stats().await;

    {
        let mut chats = state.chats.write().await;
        chats.insert(chat_id.clone(), session);
    }

    info!("Chat started: {}", chat_id);

    (
        StatusCode::OK,
        Json(StartChatResponse {
            chat_id,
            scenario,
            stats,
        }),
    )
        .into_response()
}

/// POST /chats/:chat_id/text
/// Submit one complete learner text turn
pub async fn send_text(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    Json(req): Json<SendTextRequest>,
) -> impl IntoResponse {
    let Some(session) = find_chat(&state, &chat_id).await else {
        return error_response(StatusCode::NOT_FOUND, format!("Chat {} not found", chat_id));
    };

    match session.send_text(&req.text).await {
        Ok(turn_id) => (StatusCode::OK, Json(SendTextResponse { turn_id })).into_response(),
        Err(e) => {
            error!("Failed to send text: {}", e);
            error_response(StatusCode::BAD_GATEWAY, format!("Failed to send text: {}", e))
        }
    }
}

/// POST /chats/:chat_id/record/start
/// Begin capturing the learner's utterance
pub async fn start_recording(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = find_chat(&state, &chat_id).await else {
        return error_response(StatusCode::NOT_FOUND, format!("Chat {} not found", chat_id));
    };

    match session.start_recording().await {
        Ok(()) => (StatusCode::OK, Json(session.stats().await)).into_response(),
        Err(e) => {
            error!("Failed to start recording: {}", e);
            error_response(
                StatusCode::CONFLICT,
                format!("Failed to start recording: {}", e),
            )
        }
    }
}

/// POST /chats/:chat_id/record/stop
/// Stop capturing; the utterance payload attaches to its turn
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = find_chat(&state, &chat_id).await else {
        return error_response(StatusCode::NOT_FOUND, format!("Chat {} not found", chat_id));
    };

    match session.stop_recording().await {
        Ok(()) => (StatusCode::OK, Json(session.stats().await)).into_response(),
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to stop recording: {}", e),
            )
        }
    }
}

/// POST /chats/:chat_id/audio
/// Push one captured microphone frame into the active recording
pub async fn push_audio(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    Json(req): Json<PushAudioRequest>,
) -> impl IntoResponse {
    let Some(session) = find_chat(&state, &chat_id).await else {
        return error_response(StatusCode::NOT_FOUND, format!("Chat {} not found", chat_id));
    };

    let pcm_bytes = match base64::engine::general_purpose::STANDARD.decode(&req.pcm) {
        Ok(bytes) => bytes,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid base64 PCM payload: {}", e),
            )
        }
    };

    match session.push_frame(le_bytes_to_samples(&pcm_bytes)).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(StatusCode::CONFLICT, format!("Frame rejected: {}", e)),
    }
}

/// POST /chats/:chat_id/replay/:turn_id
/// Replay a finalized turn (recorded audio, else synthesized speech)
pub async fn replay_turn(
    State(state): State<AppState>,
    Path((chat_id, turn_id)): Path<(String, Uuid)>,
) -> impl IntoResponse {
    let Some(session) = find_chat(&state, &chat_id).await else {
        return error_response(StatusCode::NOT_FOUND, format!("Chat {} not found", chat_id));
    };

    match session.replay(turn_id).await {
        Ok(playing) => (StatusCode::OK, Json(ReplayResponse { playing })).into_response(),
        Err(e) => error_response(StatusCode::CONFLICT, format!("Replay refused: {}", e)),
    }
}

/// GET /chats/:chat_id/transcript
/// Ordered turns with whatever annotations have landed so far
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = find_chat(&state, &chat_id).await else {
        return error_response(StatusCode::NOT_FOUND, format!("Chat {} not found", chat_id));
    };

    let transcript: Vec<Turn> = session.transcript().await;
    (StatusCode::OK, Json(transcript)).into_response()
}

/// GET /chats/:chat_id/status
/// Session statistics and connection state
pub async fn get_chat_status(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = find_chat(&state, &chat_id).await else {
        return error_response(StatusCode::NOT_FOUND, format!("Chat {} not found", chat_id));
    };

    (StatusCode::OK, Json(session.stats().await)).into_response()
}

/// POST /chats/:chat_id/end
/// Tear the session down and remove it
pub async fn end_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> impl IntoResponse {
    let session = {
        let mut chats = state.chats.write().await;
        chats.remove(&chat_id)
    };

    match session {
        Some(session) => {
            let stats = session.stats().await;
            session.close().await;
            info!("Chat ended: {}", chat_id);
            (
                StatusCode::OK,
                Json(EndChatResponse {
                    chat_id,
                    status: "ended".to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, format!("Chat {} not found", chat_id)),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
