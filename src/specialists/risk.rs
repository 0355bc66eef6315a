//! Risk analyzer

use super::{AnalyzerClient, AnalyzerKind, CallOutcome, SpecializedAnalyzer};
use crate::error::OrchestrationError;
use crate::llm::pretty_json;
use crate::models::{RiskAssessment, RiskLevel, SpecializedResult};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

pub struct RiskAnalyzer {
    client: AnalyzerClient,
}

impl RiskAnalyzer {
    pub fn new(client: AnalyzerClient) -> Self {
        Self { client }
    }

    fn build_prompt(query: &str, context: &Value) -> String {
        format!(
            r#"You are a specialized risk analysis expert. Analyze the following business scenario and provide a detailed risk assessment.

Query: {query}
Context: {context}

Return the result strictly as valid JSON (no text outside the JSON, no comments).
Use this exact schema:

{{
  "risk_level": "low" | "medium" | "high" | "critical",
  "probability": number between 0.0 and 1.0,
  "impact_score": integer between 1 and 10,
  "mitigation_strategies": [string],
  "risk_factors": [string]
}}

Output only the JSON object."#,
            context = pretty_json(context),
        )
    }

    /// Used when the reply does not satisfy the schema
    pub fn parse_failure_default() -> RiskAssessment {
        RiskAssessment {
            risk_level: RiskLevel::Medium,
            probability: 0.65,
            impact_score: 7.0,
            mitigation_strategies: vec![
                "Implement monitoring system".to_string(),
                "Create contingency plan".to_string(),
            ],
            risk_factors: vec![
                "Market volatility".to_string(),
                "Customer behavior changes".to_string(),
            ],
        }
    }

    /// Used when the backend cannot be reached
    pub fn unavailable_default() -> RiskAssessment {
        RiskAssessment {
            risk_level: RiskLevel::Unknown,
            probability: 0.5,
            impact_score: 5.0,
            mitigation_strategies: vec!["Manual review required".to_string()],
            risk_factors: vec!["Analysis unavailable".to_string()],
        }
    }
}

/// Range checks serde cannot express
fn validate(assessment: &RiskAssessment) -> Result<()> {
    if assessment.risk_level == RiskLevel::Unknown {
        return Err(OrchestrationError::SchemaParse(
            "risk_level must be low, medium, high or critical".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&assessment.probability) {
        return Err(OrchestrationError::SchemaParse(format!(
            "probability {} outside [0, 1]",
            assessment.probability
        )));
    }
    if !(1.0..=10.0).contains(&assessment.impact_score) {
        return Err(OrchestrationError::SchemaParse(format!(
            "impact_score {} outside [1, 10]",
            assessment.impact_score
        )));
    }
    Ok(())
}

#[async_trait]
impl SpecializedAnalyzer for RiskAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Risk
    }

    async fn process(&self, query: &str, context: &Value) -> SpecializedResult {
        let prompt = Self::build_prompt(query, context);

        let assessment = match self.client.request(self.kind(), &prompt, validate).await {
            CallOutcome::Parsed(assessment) => assessment,
            CallOutcome::Malformed => Self::parse_failure_default(),
            CallOutcome::Unavailable => Self::unavailable_default(),
        };

        SpecializedResult::Risk(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CallPolicy, ScriptedBackend};
    use crate::telemetry::Telemetry;
    use serde_json::json;
    use std::sync::Arc;

    fn analyzer(backend: ScriptedBackend) -> RiskAnalyzer {
        RiskAnalyzer::new(AnalyzerClient::new(
            Arc::new(backend),
            "test-model",
            CallPolicy::default(),
            Telemetry::disabled(),
        ))
    }

    async fn run(reply: &str) -> RiskAssessment {
        analyzer(ScriptedBackend::replying(reply))
            .process("Expand into APAC", &json!({"decision": "expand"}))
            .await
            .as_risk()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_reply_is_used() {
        let assessment = run(
            r#"{"risk_level": "critical", "probability": 0.9, "impact_score": 10,
                "mitigation_strategies": ["Pilot first"], "risk_factors": ["FX exposure"]}"#,
        )
        .await;

        assert_eq!(assessment.risk_level, RiskLevel::Critical);
        assert_eq!(assessment.impact_score, 10.0);
        assert_eq!(assessment.risk_factors, vec!["FX exposure".to_string()]);
    }

    #[tokio::test]
    async fn test_fenced_reply_is_unwrapped() {
        let assessment = run(
            "```json\n{\"risk_level\": \"low\", \"probability\": 0.1, \"impact_score\": 2, \"mitigation_strategies\": [], \"risk_factors\": []}\n```",
        )
        .await;
        assert_eq!(assessment.risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_malformed_replies_use_parse_default() {
        let defaults = RiskAnalyzer::parse_failure_default();

        assert_eq!(run("I think the risk is moderate.").await, defaults);
        // out of range
        assert_eq!(
            run(r#"{"risk_level": "high", "probability": 1.5, "impact_score": 5, "mitigation_strategies": [], "risk_factors": []}"#).await,
            defaults
        );
        assert_eq!(
            run(r#"{"risk_level": "high", "probability": 0.5, "impact_score": 0, "mitigation_strategies": [], "risk_factors": []}"#).await,
            defaults
        );
        // "unknown" is reserved for local use
        assert_eq!(
            run(r#"{"risk_level": "unknown", "probability": 0.5, "impact_score": 5, "mitigation_strategies": [], "risk_factors": []}"#).await,
            defaults
        );
        // wrong type
        assert_eq!(
            run(r#"{"risk_level": "high", "probability": "likely", "impact_score": 5, "mitigation_strategies": [], "risk_factors": []}"#).await,
            defaults
        );
    }

    #[tokio::test]
    async fn test_unavailable_backend_uses_distinct_default() {
        let result = analyzer(ScriptedBackend::failing("no route"))
            .process("q", &json!({}))
            .await;

        let assessment = result.as_risk().unwrap();
        assert_eq!(*assessment, RiskAnalyzer::unavailable_default());
        assert_ne!(*assessment, RiskAnalyzer::parse_failure_default());
        assert_eq!(
            serde_json::to_value(assessment).unwrap()["risk_level"],
            json!("unknown")
        );
    }

    #[test]
    fn test_prompt_embeds_context() {
        let prompt = RiskAnalyzer::build_prompt("Expand", &json!({"decision": "expand"}));
        assert!(prompt.contains("specialized risk analysis expert"));
        assert!(prompt.contains("\"decision\": \"expand\""));
    }
}
