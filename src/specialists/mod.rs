//! Specialized analyzers
//!
//! Each analyzer asks the model for one JSON object of a fixed schema and
//! always produces a result. A malformed or out-of-range reply yields the
//! analyzer's parse-failure default; an unreachable backend yields its
//! service-failure default. The two defaults are distinct so callers can
//! tell the cases apart.

use crate::error::OrchestrationError;
use crate::llm::{strip_json_fence, CallPolicy, LlmBackend};
use crate::models::SpecializedResult;
use crate::telemetry::Telemetry;
use crate::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub mod financial;
pub mod risk;

pub use financial::FinancialAnalyzer;
pub use risk::RiskAnalyzer;

/// Reply budget for a specialized analysis
const ANALYSIS_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    Risk,
    Financial,
}

impl AnalyzerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerKind::Risk => "risk",
            AnalyzerKind::Financial => "financial",
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for specialized analyzers
#[async_trait]
pub trait SpecializedAnalyzer: Send + Sync {
    fn kind(&self) -> AnalyzerKind;

    /// Analyze `query` with the main analysis as `context`. Never fails.
    async fn process(&self, query: &str, context: &Value) -> SpecializedResult;
}

//
// ================= Structured calls =================
//

/// How a structured call ended
#[derive(Debug)]
pub(crate) enum CallOutcome<T> {
    Parsed(T),
    /// Not JSON, wrong shape, or out of range
    Malformed,
    /// Backend error or timeout
    Unavailable,
}

/// Backend handle shared by the analyzers
#[derive(Clone)]
pub struct AnalyzerClient {
    backend: Arc<dyn LlmBackend>,
    model_id: String,
    policy: CallPolicy,
    telemetry: Telemetry,
}

impl AnalyzerClient {
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        model_id: impl Into<String>,
        policy: CallPolicy,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            backend,
            model_id: model_id.into(),
            policy,
            telemetry,
        }
    }

    /// Call the backend and decode the reply as `T`, then run `validate`
    pub(crate) async fn request<T: DeserializeOwned>(
        &self,
        kind: AnalyzerKind,
        prompt: &str,
        validate: fn(&T) -> Result<()>,
    ) -> CallOutcome<T> {
        let reply = match self
            .policy
            .call(self.backend.as_ref(), &self.model_id, prompt, ANALYSIS_MAX_TOKENS)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                error!(analyzer = %kind, error = %e, "Specialized analysis failed");
                self.telemetry.count("ServiceUnavailable");
                return CallOutcome::Unavailable;
            }
        };

        let parsed = serde_json::from_str::<T>(strip_json_fence(&reply))
            .map_err(OrchestrationError::from)
            .and_then(|value| validate(&value).map(|_| value));

        match parsed {
            Ok(value) => {
                debug!(analyzer = %kind, "Specialized analysis parsed");
                CallOutcome::Parsed(value)
            }
            Err(e) => {
                warn!(analyzer = %kind, error = %e, "Specialized reply rejected, using default");
                self.telemetry.count("SchemaParseError");
                CallOutcome::Malformed
            }
        }
    }
}

//
// ================= Registry =================
//

/// Analyzers keyed by kind; run together in multi-agent mode
#[derive(Clone, Default)]
pub struct SpecialistRegistry {
    analyzers: BTreeMap<AnalyzerKind, Arc<dyn SpecializedAnalyzer>>,
}

impl SpecialistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Risk and financial analyzers on one backend
    pub fn standard(client: AnalyzerClient) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(RiskAnalyzer::new(client.clone())));
        registry.register(Arc::new(FinancialAnalyzer::new(client)));
        registry
    }

    /// Replaces any analyzer of the same kind
    pub fn register(&mut self, analyzer: Arc<dyn SpecializedAnalyzer>) {
        self.analyzers.insert(analyzer.kind(), analyzer);
    }

    pub fn kinds(&self) -> Vec<AnalyzerKind> {
        self.analyzers.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Run every analyzer concurrently and wait for all of them
    pub async fn run_all(&self, query: &str, context: &Value) -> BTreeMap<String, SpecializedResult> {
        let runs = self.analyzers.iter().map(|(kind, analyzer)| async move {
            (kind.as_str().to_string(), analyzer.process(query, context).await)
        });

        join_all(runs).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ScriptedBackend, ScriptedReply};
    use crate::models::RiskLevel;
    use crate::telemetry::RecordingSink;
    use serde_json::json;

    const RISK_REPLY: &str = r#"{"risk_level": "high", "probability": 0.8, "impact_score": 9,
        "mitigation_strategies": ["Hire"], "risk_factors": ["Backlog"]}"#;

    fn client(backend: ScriptedBackend, telemetry: Telemetry) -> AnalyzerClient {
        AnalyzerClient::new(Arc::new(backend), "test-model", CallPolicy::default(), telemetry)
    }

    #[tokio::test]
    async fn test_run_all_keys_by_kind() {
        let backend = ScriptedBackend::failing("down")
            .on("risk analysis expert", ScriptedReply::Text(RISK_REPLY.to_string()));
        let registry = SpecialistRegistry::standard(client(backend, Telemetry::disabled()));

        let results = registry.run_all("support backlog", &json!({"decision": "hire"})).await;
        assert_eq!(results.len(), 2);

        let risk = results["risk"].as_risk().unwrap();
        assert_eq!(risk.risk_level, RiskLevel::High);

        let financial = results["financial"].as_financial().unwrap();
        assert_eq!(financial.financial_risks, vec!["Analysis unavailable".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_tiers_are_counted() {
        let sink = Arc::new(RecordingSink::new());
        let backend = ScriptedBackend::failing("down")
            .on("risk analysis expert", ScriptedReply::Text("not json".to_string()));
        let registry = SpecialistRegistry::standard(client(backend, Telemetry::new(sink.clone())));

        registry.run_all("q", &json!({})).await;

        assert_eq!(sink.total("SchemaParseError"), 1.0);
        assert_eq!(sink.total("ServiceUnavailable"), 1.0);
    }

    #[test]
    fn test_register_replaces_same_kind() {
        let c = client(ScriptedBackend::replying("{}"), Telemetry::disabled());
        let mut registry = SpecialistRegistry::standard(c.clone());
        registry.register(Arc::new(RiskAnalyzer::new(c)));

        assert_eq!(registry.kinds(), vec![AnalyzerKind::Risk, AnalyzerKind::Financial]);
        assert!(SpecialistRegistry::new().is_empty());
    }
}
