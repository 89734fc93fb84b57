use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub live: LiveConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Capture sample rate shipped to the live endpoint
    pub capture_sample_rate: u32,
    /// Playback sample rate of inbound voice fragments
    pub playback_sample_rate: u32,
    pub channels: u16,
    /// Capture frame size in milliseconds
    pub frame_duration_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    /// Live stream endpoint URL
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Config {
    /// Load configuration from a file, with LINGUA__* environment overrides
    /// (e.g. LINGUA__AI__API_KEY)
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LINGUA").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
