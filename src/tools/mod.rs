//! Tool catalogue and registry
//!
//! The catalogue is closed: `ToolId` enumerates every tool the orchestrator
//! knows. Strings coming from outside (LLM replies, callers) are converted at
//! the boundary with `ToolId::from_str`, which rejects anything else.
//!
//! Tools read enterprise records through the injected `DataSource`.

use crate::error::OrchestrationError;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

//
// ================= Catalogue =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    CustomerData,
    SupportAnalysis,
    FinancialMetrics,
}

impl ToolId {
    /// Every tool, in catalogue order
    pub const ALL: [ToolId; 3] = [
        ToolId::CustomerData,
        ToolId::SupportAnalysis,
        ToolId::FinancialMetrics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::CustomerData => "customer_data",
            ToolId::SupportAnalysis => "support_analysis",
            ToolId::FinancialMetrics => "financial_metrics",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolId::CustomerData => "Customer information, churn rates, satisfaction scores",
            ToolId::SupportAnalysis => "Support tickets, issues, resolution times",
            ToolId::FinancialMetrics => "Revenue, payments, financial performance",
        }
    }

    /// Data category this tool reads
    pub fn category(&self) -> DataCategory {
        match self {
            ToolId::CustomerData => DataCategory::Customer,
            ToolId::SupportAnalysis => DataCategory::Support,
            ToolId::FinancialMetrics => DataCategory::Financial,
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = OrchestrationError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        ToolId::ALL
            .iter()
            .find(|id| id.as_str() == normalized)
            .copied()
            .ok_or_else(|| OrchestrationError::UnknownTool(s.to_string()))
    }
}

//
// ================= Data retrieval =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataCategory {
    Customer,
    Support,
    Financial,
}

/// Enterprise data retrieval capability.
/// Returns an empty set when nothing is available; never fails.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, category: DataCategory) -> Vec<Value>;
}

/// Data source backed by records held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSource {
    records: HashMap<DataCategory, Vec<Value>>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, category: DataCategory, records: Vec<Value>) -> Self {
        self.records.entry(category).or_default().extend(records);
        self
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn fetch(&self, category: DataCategory) -> Vec<Value> {
        self.records.get(&category).cloned().unwrap_or_default()
    }
}

/// Keyword focus flags derived from a query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct QueryFocus {
    pub churn_analysis: bool,
    pub financial_focus: bool,
    pub support_focus: bool,
    pub q4_focus: bool,
    pub customer_focus: bool,
}

impl QueryFocus {
    pub fn extract(query: &str) -> Self {
        let lowered = query.to_lowercase();
        let has_any = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

        Self {
            churn_analysis: has_any(&["churn", "risk", "retention", "leaving"]),
            financial_focus: has_any(&["revenue", "payment", "financial", "billing"]),
            support_focus: has_any(&["support", "tickets", "issues", "problems"]),
            q4_focus: has_any(&["q4", "quarter"]),
            customer_focus: has_any(&["customer", "client", "account"]),
        }
    }
}

//
// ================= Tools =================
//

/// Trait for a single tool
#[async_trait]
pub trait Tool: Send + Sync {
    fn id(&self) -> ToolId;
    async fn execute(&self) -> Value;
}

/// Tool that returns every record of its data category
pub struct DataRetrievalTool {
    id: ToolId,
    source: Arc<dyn DataSource>,
}

impl DataRetrievalTool {
    pub fn new(id: ToolId, source: Arc<dyn DataSource>) -> Self {
        Self { id, source }
    }
}

#[async_trait]
impl Tool for DataRetrievalTool {
    fn id(&self) -> ToolId {
        self.id
    }

    async fn execute(&self) -> Value {
        let data = self.source.fetch(self.id.category()).await;
        json!({
            "tool": self.id.as_str(),
            "data": data,
        })
    }
}

/// Registry mapping each catalogue id to its handler
pub struct ToolRegistry {
    tools: HashMap<ToolId, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with a data retrieval tool for every catalogue entry
    pub fn with_data_source(source: Arc<dyn DataSource>) -> Self {
        let mut registry = Self::new();
        for id in ToolId::ALL {
            registry.register(Arc::new(DataRetrievalTool::new(id, source.clone())));
        }
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.id(), tool);
    }

    /// Run one tool; a missing handler yields an empty object
    pub async fn execute(&self, id: ToolId) -> Value {
        match self.tools.get(&id) {
            Some(tool) => {
                debug!(tool = %id, "Executing tool");
                tool.execute().await
            }
            None => {
                warn!(tool = %id, "Tool not registered");
                Value::Object(Map::new())
            }
        }
    }

    /// Run tools in order, keyed by tool name
    pub async fn execute_all(&self, ids: &[ToolId]) -> BTreeMap<String, Value> {
        let mut results = BTreeMap::new();
        for id in ids {
            results.insert(id.as_str().to_string(), self.execute(*id).await);
        }
        results
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Arc<dyn DataSource> {
        Arc::new(
            InMemoryDataSource::new()
                .with_records(
                    DataCategory::Customer,
                    vec![json!({"customer_id": "C-1", "churn_risk": 0.8})],
                )
                .with_records(
                    DataCategory::Support,
                    vec![json!({"ticket_id": "T-9", "severity": "high"})],
                ),
        )
    }

    #[test]
    fn test_tool_id_parsing() {
        assert_eq!("customer_data".parse::<ToolId>().unwrap(), ToolId::CustomerData);
        assert_eq!(" Financial_Metrics ".parse::<ToolId>().unwrap(), ToolId::FinancialMetrics);
        assert!(matches!(
            "web_search".parse::<ToolId>(),
            Err(OrchestrationError::UnknownTool(_))
        ));
    }

    #[test]
    fn test_query_focus() {
        let focus = QueryFocus::extract("Which Q4 customers are leaving over billing issues?");
        assert!(focus.churn_analysis);
        assert!(focus.financial_focus);
        assert!(focus.support_focus);
        assert!(focus.q4_focus);
        assert!(focus.customer_focus);

        assert_eq!(QueryFocus::extract("hello"), QueryFocus::default());
    }

    #[tokio::test]
    async fn test_registry_executes_data_tools() {
        let registry = ToolRegistry::with_data_source(source());
        for id in ToolId::ALL {
            assert_eq!(registry.execute(id).await["tool"], id.as_str());
        }

        let output = registry.execute(ToolId::CustomerData).await;
        assert_eq!(output["tool"], "customer_data");
        assert_eq!(output["data"][0]["customer_id"], "C-1");

        // No financial records: empty set, not an error
        let output = registry.execute(ToolId::FinancialMetrics).await;
        assert_eq!(output["data"], json!([]));
    }

    #[tokio::test]
    async fn test_missing_handler_yields_empty_object() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.execute(ToolId::SupportAnalysis).await, json!({}));
    }

    #[tokio::test]
    async fn test_execute_all_keys_by_name() {
        let registry = ToolRegistry::with_data_source(source());
        let results = registry
            .execute_all(&[ToolId::CustomerData, ToolId::SupportAnalysis])
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results["support_analysis"]["data"][0]["severity"], "high");
    }
}
