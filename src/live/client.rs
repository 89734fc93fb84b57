use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use tracing::{debug, info};

use super::messages::{AudioFrameMessage, SessionSetupMessage, TextTurnMessage};

/// Client for one live conversation stream
///
/// One connection per chat session. Outbound traffic is the learner's audio
/// frames and text turns; inbound traffic is the event stream consumed via
/// `subscribe_events`.
pub struct LiveClient {
    client: Client,
    session_id: String,
}

impl LiveClient {
    /// Connect to the live endpoint
    pub async fn connect(url: &str, session_id: String) -> Result<Self> {
        info!("Connecting to live endpoint at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to live endpoint")?;

        info!("Connected to live endpoint successfully");

        Ok(Self { client, session_id })
    }

    /// Send the session setup (scenario persona) for this chat
    pub async fn send_setup(&self, language: &str, system_prompt: &str) -> Result<()> {
        let subject = format!("live.setup.chat-{}", self.session_id);

        let message = SessionSetupMessage {
            session_id: self.session_id.clone(),
            language: language.to_string(),
            system_prompt: system_prompt.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish session setup")?;

        info!("Published session setup to {}", subject);

        Ok(())
    }

    /// Publish one captured audio frame to the live stream
    pub async fn publish_audio_frame(
        &self,
        pcm_bytes: &[u8],
        sample_rate: u32,
        channels: u16,
        sequence: u32,
        is_final: bool,
    ) -> Result<()> {
        let subject = format!("live.audio.chat-{}", self.session_id);

        let message = AudioFrameMessage {
            session_id: self.session_id.clone(),
            sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm_bytes),
            sample_rate,
            channels,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: is_final,
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish audio frame")?;

        debug!(
            "Published audio frame to {} (seq={}, bytes={}, final={})",
            subject,
            sequence,
            pcm_bytes.len(),
            is_final
        );

        Ok(())
    }

    /// Publish one complete learner text turn
    pub async fn publish_text_turn(&self, text: &str) -> Result<()> {
        let subject = format!("live.text.chat-{}", self.session_id);

        let message = TextTurnMessage {
            session_id: self.session_id.clone(),
            text: text.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish text turn")?;

        info!("Published text turn to {} ({} chars)", subject, text.len());

        Ok(())
    }

    /// Subscribe to inbound live events
    pub async fn subscribe_events(&self) -> Result<async_nats::Subscriber> {
        // Subscribe to the whole event namespace and filter by session_id
        // in the payload; the endpoint publishes to live.event.chat-<id>.
        let subject = "live.event.>";

        info!("Subscribing to live events on {}", subject);

        let subscriber = self
            .client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to live events")?;

        info!("Subscribed to {}", subject);

        Ok(subscriber)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Close the live connection
    pub async fn close(&self) -> Result<()> {
        info!("Closing live connection");
        // async-nats handles cleanup on drop
        Ok(())
    }
}
