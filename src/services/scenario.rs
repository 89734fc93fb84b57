use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ScenarioGenerator;

/// A roleplay scenario driving one chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub title: String,
    pub description: String,
    /// Role the learner plays
    pub learner_role: String,
    /// Role the AI tutor plays
    pub tutor_role: String,
    pub location: String,
    /// Persona instructions sent as the live session's system prompt
    pub system_prompt: String,
    /// Opening line spoken by the tutor, in the target language
    pub opening_line: String,
}

/// Inputs to scenario generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRequest {
    /// Target language (e.g. "Italian")
    pub language: String,
    /// Learner display name, woven into the roleplay
    pub learner_name: String,
    /// Description of the previous scenario, to avoid repeats
    #[serde(default)]
    pub avoid: Option<String>,
}

/// The scenario every chat can fall back to when generation fails
pub fn fallback_scenario(language: &str, learner_name: &str) -> Scenario {
    Scenario {
        title: "Cafe Encounter".to_string(),
        description: format!(
            "You strike up a conversation with a friendly barista while \
             ordering a coffee, practicing everyday {} small talk.",
            language
        ),
        learner_role: "A customer ordering at the counter".to_string(),
        tutor_role: "A warm, chatty barista".to_string(),
        location: "A small neighborhood cafe".to_string(),
        system_prompt: format!(
            "You are a warm, chatty barista in a small neighborhood cafe. \
             The customer, {name}, is learning {lang}. Stay in character, \
             speak only {lang}, keep sentences short and simple, and gently \
             keep the conversation going with questions.",
            name = learner_name,
            lang = language
        ),
        opening_line: String::new(),
    }
}

/// Generate a scenario, masking any failure with the fixed fallback
///
/// Scenario generation must never block a chat from starting.
pub async fn generate_or_fallback(
    generator: &dyn ScenarioGenerator,
    request: &ScenarioRequest,
) -> Scenario {
    match generator.generate(request).await {
        Ok(scenario) => scenario,
        Err(e) => {
            warn!("Scenario generation failed, using fallback: {}", e);
            fallback_scenario(&request.language, &request.learner_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    struct FailingGenerator;

    #[async_trait]
    impl ScenarioGenerator for FailingGenerator {
        async fn generate(&self, _request: &ScenarioRequest) -> Result<Scenario> {
            Err(anyhow!("service unavailable"))
        }
    }

    struct FixedGenerator(Scenario);

    #[async_trait]
    impl ScenarioGenerator for FixedGenerator {
        async fn generate(&self, _request: &ScenarioRequest) -> Result<Scenario> {
            Ok(self.0.clone())
        }
    }

    fn request() -> ScenarioRequest {
        ScenarioRequest {
            language: "Italian".to_string(),
            learner_name: "Ana".to_string(),
            avoid: None,
        }
    }

    #[tokio::test]
    async fn test_failure_masked_by_fallback() {
        let scenario = generate_or_fallback(&FailingGenerator, &request()).await;
        assert_eq!(scenario.title, "Cafe Encounter");
        assert!(scenario.system_prompt.contains("Italian"));
        assert!(scenario.system_prompt.contains("Ana"));
    }

    #[tokio::test]
    async fn test_generated_scenario_passes_through() {
        let mut generated = fallback_scenario("Italian", "Ana");
        generated.title = "Lost in Trastevere".to_string();

        let scenario = generate_or_fallback(&FixedGenerator(generated), &request()).await;
        assert_eq!(scenario.title, "Lost in Trastevere");
    }
}
