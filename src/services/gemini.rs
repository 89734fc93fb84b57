// Gemini adapter for the unary AI calls
//
// All four service traits resolve to generateContent requests against the
// same API: text prompts for grammar and scenarios, inline WAV for
// pronunciation, AUDIO response modality for synthesis. Verdict payloads
// are requested as strict JSON and parsed out of the model's reply.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    GrammarChecker, GrammarVerdict, PronunciationReport, PronunciationScorer, Scenario,
    ScenarioGenerator, ScenarioRequest, SpeechSynthesizer, SynthesizedSpeech,
};
use crate::audio::le_bytes_to_samples;
use crate::config::AiConfig;

/// Sample rate of audio returned by the synthesis endpoint
const TTS_SAMPLE_RATE: u32 = 24000;

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    fn audio(mime_type: &str, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data,
            }),
        }
    }
}

#[derive(Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseModalities", skip_serializing_if = "Vec::is_empty")]
    response_modalities: Vec<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "inlineData", default)]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Deserialize)]
struct ResponseInlineData {
    data: String,
}

pub struct GeminiClient {
    client: Client,
    config: AiConfig,
}

impl GeminiClient {
    pub fn new(config: AiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Gemini request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini {}: {}", status, body));
        }

        response
            .json::<GenerateResponse>()
            .await
            .context("Gemini response parse failed")
    }

    async fn generate_text(&self, prompt: String) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            generation_config: Some(GenerationConfig {
                temperature: 0.3,
                max_output_tokens: 2048,
                response_modalities: Vec::new(),
            }),
        };

        let response = self.generate(request).await?;

        response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .and_then(|p| p.text.clone())
            .ok_or_else(|| anyhow!("Gemini returned no text candidate"))
    }
}

/// Strip a markdown code fence around a JSON reply, if present
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);

    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

#[async_trait]
impl GrammarChecker for GeminiClient {
    async fn check(&self, language: &str, text: &str, context: &str) -> Result<GrammarVerdict> {
        let prompt = format!(
            "You are a {lang} grammar checker for a language learner. \
             Scenario context: {ctx}\n\
             Learner utterance: \"{text}\"\n\
             Reply with ONLY a JSON object: \
             {{\"correct\": true|false, \"corrected\": string or null, \
             \"explanation\": string or null}}. \
             Keep the explanation to one short sentence in English.",
            lang = language,
            ctx = context,
            text = text
        );

        let reply = self.generate_text(prompt).await?;

        serde_json::from_str(extract_json(&reply))
            .context("Grammar verdict was not valid JSON")
    }
}

#[async_trait]
impl PronunciationScorer for GeminiClient {
    async fn score(&self, language: &str, wav: &[u8]) -> Result<PronunciationReport> {
        let prompt = format!(
            "The attached recording is a learner speaking {lang}. \
             Score the pronunciation from 0 to 100 and reply with ONLY a \
             JSON object: {{\"score\": number, \"feedback\": string, \
             \"flagged_words\": [string]}}. Feedback is one short sentence \
             in English.",
            lang = language
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::text(prompt),
                    Part::audio(
                        "audio/wav",
                        base64::engine::general_purpose::STANDARD.encode(wav),
                    ),
                ],
            }],
            generation_config: Some(GenerationConfig {
                temperature: 0.0,
                max_output_tokens: 1024,
                response_modalities: Vec::new(),
            }),
        };

        let response = self.generate(request).await?;
        let reply = response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .and_then(|p| p.text.clone())
            .ok_or_else(|| anyhow!("Gemini returned no text candidate"))?;

        serde_json::from_str(extract_json(&reply))
            .context("Pronunciation report was not valid JSON")
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(&self, language: &str, text: &str) -> Result<SynthesizedSpeech> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text(format!(
                    "Speak the following {} sentence naturally: {}",
                    language, text
                ))],
            }],
            generation_config: Some(GenerationConfig {
                temperature: 0.0,
                max_output_tokens: 8192,
                response_modalities: vec!["AUDIO".to_string()],
            }),
        };

        let response = self.generate(request).await?;

        let data = response
            .candidates
            .first()
            .and_then(|c| c.content.parts.iter().find_map(|p| p.inline_data.as_ref()))
            .map(|d| d.data.clone())
            .ok_or_else(|| anyhow!("Gemini returned no audio candidate"))?;

        let pcm_bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .context("Synthesized audio was not valid base64")?;

        Ok(SynthesizedSpeech {
            samples: le_bytes_to_samples(&pcm_bytes),
            sample_rate: TTS_SAMPLE_RATE,
        })
    }
}

#[async_trait]
impl ScenarioGenerator for GeminiClient {
    async fn generate(&self, request: &ScenarioRequest) -> Result<Scenario> {
        let avoid = request
            .avoid
            .as_deref()
            .map(|prev| format!(" Avoid anything similar to this previous scenario: {}.", prev))
            .unwrap_or_default();

        let prompt = format!(
            "Invent a short roleplay scenario for practicing {lang} with a \
             learner named {name}.{avoid} Reply with ONLY a JSON object: \
             {{\"title\": string, \"description\": string, \
             \"learner_role\": string, \"tutor_role\": string, \
             \"location\": string, \"system_prompt\": string, \
             \"opening_line\": string}}. The system_prompt instructs the \
             tutor character to stay in role and speak only {lang}; the \
             opening_line is the tutor's first sentence, in {lang}.",
            lang = request.language,
            name = request.learner_name,
            avoid = avoid
        );

        let reply = self.generate_text(prompt).await?;

        serde_json::from_str(extract_json(&reply))
            .context("Scenario was not valid JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_plain() {
        assert_eq!(extract_json("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_extract_json_fenced() {
        let fenced = "```json\n{\"correct\": true}\n```";
        assert_eq!(extract_json(fenced), "{\"correct\": true}");

        let bare_fence = "```\n{\"correct\": false}\n```";
        assert_eq!(extract_json(bare_fence), "{\"correct\": false}");
    }

    #[test]
    fn test_verdict_parses_with_missing_optionals() {
        let verdict: GrammarVerdict =
            serde_json::from_str(extract_json("{\"correct\": true}")).unwrap();
        assert!(verdict.correct);
        assert!(verdict.corrected.is_none());
        assert!(verdict.explanation.is_none());
    }
}
