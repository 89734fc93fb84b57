use crate::chat::ChatSession;
use crate::config::Config;
use crate::services::ServiceSet;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active chat sessions (chat_id → session)
    pub chats: Arc<RwLock<HashMap<String, Arc<ChatSession>>>>,

    /// AI collaborators shared by all sessions
    pub services: ServiceSet,

    /// Service configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, services: ServiceSet) -> Self {
        Self {
            chats: Arc::new(RwLock::new(HashMap::new())),
            services,
            config: Arc::new(config),
        }
    }
}
