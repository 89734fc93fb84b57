use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Chat lifecycle
        .route("/chats/start", post(handlers::start_chat))
        .route("/chats/:chat_id/end", post(handlers::end_chat))
        // Conversation
        .route("/chats/:chat_id/text", post(handlers::send_text))
        .route(
            "/chats/:chat_id/record/start",
            post(handlers::start_recording),
        )
        .route(
            "/chats/:chat_id/record/stop",
            post(handlers::stop_recording),
        )
        .route("/chats/:chat_id/audio", post(handlers::push_audio))
        .route(
            "/chats/:chat_id/replay/:turn_id",
            post(handlers::replay_turn),
        )
        // Queries
        .route("/chats/:chat_id/transcript", get(handlers::get_transcript))
        .route("/chats/:chat_id/status", get(handlers::get_chat_status))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
