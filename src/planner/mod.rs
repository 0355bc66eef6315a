//! Tool selection
//!
//! Asks the language model which data tools a query needs. Selection never
//! fails: any backend problem falls back to customer data.

use crate::llm::{CallPolicy, LlmBackend};
use crate::telemetry::Telemetry;
use crate::tools::ToolId;
use std::sync::Arc;
use tracing::{info, warn};

/// Reply budget for tool selection
const SELECTION_MAX_TOKENS: u32 = 100;

/// Used when the reply names no tool or the backend is unavailable
pub const FALLBACK_TOOL: ToolId = ToolId::CustomerData;

pub struct ToolSelector {
    backend: Arc<dyn LlmBackend>,
    model_id: String,
    policy: CallPolicy,
    telemetry: Telemetry,
}

impl ToolSelector {
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

    /// Tools needed for `query`, in catalogue order
    pub async fn select_tools(&self, query: &str) -> Vec<ToolId> {
        let prompt = Self::build_prompt(query);

        match self
            .policy
            .call(self.backend.as_ref(), &self.model_id, &prompt, SELECTION_MAX_TOKENS)
            .await
        {
            Ok(reply) => {
                let tools = Self::parse_selection(&reply);
                info!(tools = ?tools, "Tools selected");
                tools
            }
            Err(e) => {
                warn!(error = %e, "Tool selection failed, using fallback tool");
                self.telemetry.count("ServiceUnavailable");
                vec![FALLBACK_TOOL]
            }
        }
    }

    fn build_prompt(query: &str) -> String {
        let catalogue = ToolId::ALL
            .iter()
            .map(|tool| format!("- {}: {}", tool.as_str(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Available tools:
{catalogue}

Query: {query}

Which tools are needed? Respond with only tool names separated by commas, or "none" if no tools needed."#
        )
    }

    /// "none" anywhere means no tools; otherwise every catalogue id
    /// mentioned in the reply
    fn parse_selection(reply: &str) -> Vec<ToolId> {
        let reply = reply.trim().to_lowercase();

        if reply.contains("none") {
            return Vec::new();
        }

        let selected: Vec<ToolId> = ToolId::ALL
            .iter()
            .copied()
            .filter(|tool| reply.contains(tool.as_str()))
            .collect();

        if selected.is_empty() {
            vec![FALLBACK_TOOL]
        } else {
            selected
        }
    }
}
