//! External AI collaborators
//!
//! Grammar validation, pronunciation scoring, speech synthesis and scenario
//! generation are opaque asynchronous calls into a generative-AI service.
//! They are modeled as traits so sessions depend on the capability, not the
//! vendor; `GeminiClient` implements all of them over HTTPS. Failures
//! degrade silently at the call sites: no annotation is attached and no
//! error reaches the learner.

pub mod gemini;
pub mod scenario;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AiConfig;
pub use gemini::GeminiClient;
pub use scenario::{fallback_scenario, generate_or_fallback, Scenario, ScenarioRequest};

/// Grammar verdict for a finalized learner turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarVerdict {
    /// Whether the utterance was grammatically acceptable
    pub correct: bool,
    /// Corrected phrasing, when `correct` is false
    #[serde(default)]
    pub corrected: Option<String>,
    /// Short explanation of the correction
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Pronunciation feedback for one recorded utterance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PronunciationReport {
    /// Overall score, 0-100
    pub score: u8,
    /// One-sentence feedback
    pub feedback: String,
    /// Words the scorer flagged as mispronounced
    #[serde(default)]
    pub flagged_words: Vec<String>,
}

/// Synthesized speech returned by the TTS call
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    /// Raw mono i16 PCM samples
    pub samples: Vec<i16>,
    /// Sample rate of the synthesized audio (Hz)
    pub sample_rate: u32,
}

#[async_trait]
pub trait GrammarChecker: Send + Sync {
    /// Validate one learner utterance in the context of the scenario
    async fn check(&self, language: &str, text: &str, context: &str) -> Result<GrammarVerdict>;
}

#[async_trait]
pub trait PronunciationScorer: Send + Sync {
    /// Score a WAV-encoded utterance
    async fn score(&self, language: &str, wav: &[u8]) -> Result<PronunciationReport>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize speech for replaying turns without recorded audio
    async fn synthesize(&self, language: &str, text: &str) -> Result<SynthesizedSpeech>;
}

#[async_trait]
pub trait ScenarioGenerator: Send + Sync {
    async fn generate(&self, request: &ScenarioRequest) -> Result<Scenario>;
}

/// Bundle of the AI collaborators one chat session uses
#[derive(Clone)]
pub struct ServiceSet {
    pub grammar: Arc<dyn GrammarChecker>,
    pub pronunciation: Arc<dyn PronunciationScorer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub scenarios: Arc<dyn ScenarioGenerator>,
}

impl ServiceSet {
    /// Wire every capability to one shared Gemini client
    pub fn gemini(config: &AiConfig) -> Self {
        let client = Arc::new(GeminiClient::new(config.clone()));
        Self {
            grammar: client.clone(),
            pronunciation: client.clone(),
            synthesizer: client.clone(),
            scenarios: client,
        }
    }
}
