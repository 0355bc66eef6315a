//! Core data models for the decision orchestrator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::classifier::QueryCategory;
use crate::tools::ToolId;

/// Free-form JSON object used for opaque responses and context maps
pub type JsonObject = Map<String, Value>;

//
// ================= Memory =================
//

/// One raw interaction in the conversation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub query: String,
    pub response: Value,
    pub timestamp: DateTime<Utc>,
}

/// A stored interaction inside the vector memory.
///
/// Identity is insertion order: `sequence_id` only ever grows and is never
/// reused after eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub sequence_id: u64,
    pub query: String,
    pub response: Value,
    pub context_snapshot: JsonObject,
    /// SHA-256 fingerprint of `context_snapshot`
    pub context_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A memory returned by similarity search, annotated with its score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarMemory {
    #[serde(flatten)]
    pub record: MemoryRecord,
    pub similarity_score: f64,
}

/// One {query, decision, confidence} entry of a decision pattern bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionPatternEntry {
    pub query: String,
    pub decision: Value,
    pub confidence: f64,
}

//
// ================= Analytics =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetric {
    pub query: String,
    pub response_time: f64,
    /// Always within [0, 100]
    pub confidence: f64,
    pub tools_used: Vec<ToolId>,
    pub decision_type: QueryCategory,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Info,
    Performance,
    Tools,
    Accuracy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizationRecommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub priority: Priority,
    pub issue: String,
    pub recommendation: String,
    pub expected_improvement: String,
}

//
// ================= Specialized analysis =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    /// Only produced locally when the risk backend is unreachable
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub probability: f64,
    pub impact_score: f64,
    pub mitigation_strategies: Vec<String>,
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostAnalysis {
    pub implementation_cost: f64,
    pub operational_cost: f64,
    pub savings: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialAssessment {
    pub revenue_impact: f64,
    pub cost_analysis: CostAnalysis,
    pub roi: f64,
    /// Months
    pub payback_period: f64,
    pub financial_risks: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Schema-constrained output of one specialized analyzer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SpecializedResult {
    Risk(RiskAssessment),
    Financial(FinancialAssessment),
}

impl SpecializedResult {
    pub fn as_risk(&self) -> Option<&RiskAssessment> {
        match self {
            SpecializedResult::Risk(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_financial(&self) -> Option<&FinancialAssessment> {
        match self {
            SpecializedResult::Financial(f) => Some(f),
            _ => None,
        }
    }
}

//
// ================= Orchestration =================
//

/// Stages a query passes through inside the orchestrator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStage {
    Received,
    ContextRetrieved,
    ToolsSelected,
    ToolsExecuted,
    MainAnalysisDone,
    SpecializedDone,
    MemoryUpdated,
    MetricsRecorded,
    Complete,
    Failed,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryStage::Received => "RECEIVED",
            QueryStage::ContextRetrieved => "CONTEXT_RETRIEVED",
            QueryStage::ToolsSelected => "TOOLS_SELECTED",
            QueryStage::ToolsExecuted => "TOOLS_EXECUTED",
            QueryStage::MainAnalysisDone => "MAIN_ANALYSIS_DONE",
            QueryStage::SpecializedDone => "SPECIALIZED_DONE",
            QueryStage::MemoryUpdated => "MEMORY_UPDATED",
            QueryStage::MetricsRecorded => "METRICS_RECORDED",
            QueryStage::Complete => "COMPLETE",
            QueryStage::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationPerformance {
    /// Seconds
    pub execution_time: f64,
    pub tools_used: Vec<ToolId>,
    pub memory_context_size: usize,
}

/// Result of a single-agent query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResult {
    pub query_id: Uuid,
    pub analysis: JsonObject,
    pub performance: InvocationPerformance,
    pub stage_trace: Vec<QueryStage>,
}

impl DecisionResult {
    /// Confidence reported by the main analysis, clamped into [0, 100]
    pub fn confidence(&self) -> f64 {
        response_confidence(&self.analysis)
    }

    pub fn decision(&self) -> Option<&Value> {
        self.analysis.get("decision")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationType {
    SingleAgent,
    MultiAgent,
}

/// Result of a multi-agent query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeResult {
    pub main: DecisionResult,
    pub specialized_analysis: BTreeMap<String, SpecializedResult>,
    pub orchestration_type: OrchestrationType,
}

impl CompositeResult {
    /// Flatten into a single object: main analysis fields first, then the
    /// nested specialized results. Existing main fields are never replaced.
    pub fn merged_payload(&self) -> JsonObject {
        let mut payload = self.main.analysis.clone();

        if let Ok(specialized) = serde_json::to_value(&self.specialized_analysis) {
            payload
                .entry("specialized_analysis".to_string())
                .or_insert(specialized);
        }
        if let Ok(kind) = serde_json::to_value(self.orchestration_type) {
            payload
                .entry("orchestration_type".to_string())
                .or_insert(kind);
        }

        payload
    }
}

/// Read the `confidence` field of a response, defaulting to 0 and clamping
/// into [0, 100]
pub fn response_confidence(response: &JsonObject) -> f64 {
    response
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decision(analysis: Value) -> DecisionResult {
        DecisionResult {
            query_id: Uuid::new_v4(),
            analysis: analysis.as_object().cloned().unwrap_or_default(),
            performance: InvocationPerformance {
                execution_time: 0.2,
                tools_used: vec![ToolId::CustomerData],
                memory_context_size: 0,
            },
            stage_trace: vec![QueryStage::Received],
        }
    }

    #[test]
    fn test_response_confidence_clamps() {
        let high = json!({"confidence": 140});
        assert_eq!(response_confidence(high.as_object().unwrap()), 100.0);

        let missing = json!({"decision": "keep"});
        assert_eq!(response_confidence(missing.as_object().unwrap()), 0.0);

        let text = json!({"confidence": "high"});
        assert_eq!(response_confidence(text.as_object().unwrap()), 0.0);
    }

    #[test]
    fn test_merged_payload_keeps_main_fields() {
        let mut specialized = BTreeMap::new();
        specialized.insert(
            "risk".to_string(),
            SpecializedResult::Risk(RiskAssessment {
                risk_level: RiskLevel::Low,
                probability: 0.1,
                impact_score: 2.0,
                mitigation_strategies: vec![],
                risk_factors: vec![],
            }),
        );

        let composite = CompositeResult {
            main: decision(json!({
                "decision": "expand support team",
                "orchestration_type": "custom"
            })),
            specialized_analysis: specialized,
            orchestration_type: OrchestrationType::MultiAgent,
        };

        let payload = composite.merged_payload();
        assert_eq!(payload["decision"], json!("expand support team"));
        assert_eq!(payload["orchestration_type"], json!("custom"));
        assert_eq!(payload["specialized_analysis"]["risk"]["risk_level"], json!("low"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(QueryStage::MainAnalysisDone.to_string(), "MAIN_ANALYSIS_DONE");
        assert_eq!(
            serde_json::to_value(QueryStage::SpecializedDone).unwrap(),
            json!("SPECIALIZED_DONE")
        );
    }
}
