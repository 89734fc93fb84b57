// Scenario generation fallback behavior

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lingua_live::services::{
    generate_or_fallback, Scenario, ScenarioGenerator, ScenarioRequest,
};

struct DownstreamOutage;

#[async_trait]
impl ScenarioGenerator for DownstreamOutage {
    async fn generate(&self, _request: &ScenarioRequest) -> Result<Scenario> {
        Err(anyhow!("503 service unavailable"))
    }
}

#[tokio::test]
async fn test_chat_starts_on_fallback_scenario() {
    let request = ScenarioRequest {
        language: "French".to_string(),
        learner_name: "Sam".to_string(),
        avoid: Some("a cooking class in Lyon".to_string()),
    };

    let scenario = generate_or_fallback(&DownstreamOutage, &request).await;

    assert_eq!(scenario.title, "Cafe Encounter");
    assert!(!scenario.system_prompt.is_empty());
    assert!(scenario.system_prompt.contains("French"));
    assert!(scenario.system_prompt.contains("Sam"));
}
