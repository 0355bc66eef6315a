//! Main orchestrator - runs one query through the decision pipeline
//!
//! RECEIVED → CONTEXT_RETRIEVED → TOOLS_SELECTED → TOOLS_EXECUTED →
//! MAIN_ANALYSIS_DONE → [SPECIALIZED_DONE] → MEMORY_UPDATED →
//! METRICS_RECORDED → COMPLETE
//!
//! Only the main analysis can fail a query, and only in strict mode. A failed
//! query leaves memory and metrics untouched.

use crate::analytics::{OptimizationAdvisor, PerformanceSummary, PerformanceTracker};
use crate::config::OrchestratorConfig;
use crate::llm::{parse_json_object, pretty_json, CallPolicy, LlmBackend};
use crate::memory::{EnhancedContext, MemoryManager};
use crate::models::{
    CompositeResult, DecisionResult, InvocationPerformance, JsonObject, OptimizationRecommendation,
    OrchestrationType, QueryStage, SpecializedResult,
};
use crate::planner::ToolSelector;
use crate::specialists::{AnalyzerClient, SpecialistRegistry};
use crate::telemetry::Telemetry;
use crate::tools::{DataSource, QueryFocus, ToolRegistry};
use crate::Result;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Reply budget for the main analysis
const MAIN_ANALYSIS_MAX_TOKENS: u32 = 1500;

/// Substituted for the main analysis when the backend fails in lenient mode
pub const DEGRADED_ANALYSIS: &str =
    "Something went wrong while invoking the language model. Check logs for more details.";

/// Everything one pipeline run produced
struct PipelineOutput {
    main: DecisionResult,
    specialized: Option<BTreeMap<String, SpecializedResult>>,
}

/// Main orchestrator that coordinates memory, tools, analysis and analytics
pub struct Orchestrator {
    config: OrchestratorConfig,
    backend: Arc<dyn LlmBackend>,
    policy: CallPolicy,
    selector: ToolSelector,
    tools: ToolRegistry,
    specialists: SpecialistRegistry,
    memory: RwLock<MemoryManager>,
    tracker: RwLock<PerformanceTracker>,
    telemetry: Telemetry,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        backend: Arc<dyn LlmBackend>,
        data_source: Arc<dyn DataSource>,
        telemetry: Telemetry,
    ) -> Result<Self> {
        config.validate()?;

        let policy = CallPolicy::from_config(&config);
        let selector = ToolSelector::new(
            backend.clone(),
            config.model_id.clone(),
            policy.clone(),
            telemetry.clone(),
        );
        let specialists = SpecialistRegistry::standard(AnalyzerClient::new(
            backend.clone(),
            config.model_id.clone(),
            policy.clone(),
            telemetry.clone(),
        ));

        Ok(Self {
            memory: RwLock::new(MemoryManager::new(&config, telemetry.clone())),
            tracker: RwLock::new(PerformanceTracker::new(telemetry.clone())),
            tools: ToolRegistry::with_data_source(data_source),
            config,
            backend,
            policy,
            selector,
            specialists,
            telemetry,
        })
    }

    /// Replace the specialized analyzers used by `orchestrate`
    pub fn with_specialists(mut self, specialists: SpecialistRegistry) -> Self {
        self.specialists = specialists;
        self
    }

    /// Single-agent query
    pub async fn invoke(&self, query: &str) -> Result<DecisionResult> {
        let output = self.run(query, false).await?;
        Ok(output.main)
    }

    /// Main analysis followed by every specialized analyzer
    pub async fn orchestrate(&self, query: &str) -> Result<CompositeResult> {
        let output = self.run(query, true).await?;

        Ok(CompositeResult {
            main: output.main,
            specialized_analysis: output.specialized.unwrap_or_default(),
            orchestration_type: OrchestrationType::MultiAgent,
        })
    }

    pub async fn performance_summary(&self) -> PerformanceSummary {
        self.tracker.read().await.summary()
    }

    pub async fn optimization_recommendations(&self) -> Vec<OptimizationRecommendation> {
        OptimizationAdvisor::recommend(&self.performance_summary().await)
    }

    /// Set a free-form context value carried into later memories
    pub async fn set_context(&self, key: impl Into<String>, value: Value) {
        self.memory.write().await.set_context(key, value);
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn memory(&self) -> &RwLock<MemoryManager> {
        &self.memory
    }

    pub fn tracker(&self) -> &RwLock<PerformanceTracker> {
        &self.tracker
    }

    async fn run(&self, query: &str, multi_agent: bool) -> Result<PipelineOutput> {
        let start_time = Instant::now();
        let query_id = Uuid::new_v4();
        let mut stage_trace = vec![QueryStage::Received];

        info!(%query_id, query, multi_agent, "Agent invocation started");
        self.telemetry.count("AgentInvocations");

        // === CONTEXT ===
        let context = self.memory.read().await.enhanced_context(query);
        stage_trace.push(QueryStage::ContextRetrieved);

        // === TOOLS ===
        let tools_used = self.selector.select_tools(query).await;
        stage_trace.push(QueryStage::ToolsSelected);

        let tool_results = self.tools.execute_all(&tools_used).await;
        debug!(%query_id, tool_count = tool_results.len(), "Tools executed");
        stage_trace.push(QueryStage::ToolsExecuted);

        // === MAIN ANALYSIS ===
        let analysis = match self.main_analysis(query, &context, &tool_results).await {
            Ok(analysis) => analysis,
            Err(e) => {
                stage_trace.push(QueryStage::Failed);
                error!(
                    %query_id,
                    error = %e,
                    execution_time = start_time.elapsed().as_secs_f64(),
                    stages = ?stage_trace,
                    "Agent invocation failed"
                );
                self.telemetry.count("FailedInvocations");
                self.telemetry.event(
                    "query_failed",
                    json!({
                        "query_id": query_id.to_string(),
                        "error": e.to_string(),
                        "stage_trace": stage_trace,
                    }),
                );
                return Err(e);
            }
        };
        stage_trace.push(QueryStage::MainAnalysisDone);

        // === SPECIALIZED ===
        let specialized = if multi_agent {
            let main_context = Value::Object(analysis.clone());
            debug!(%query_id, analyzers = ?self.specialists.kinds(), "Running specialized analyzers");
            let results = self.specialists.run_all(query, &main_context).await;
            stage_trace.push(QueryStage::SpecializedDone);
            Some(results)
        } else {
            None
        };

        // === MEMORY ===
        let stored = stored_payload(&analysis, specialized.as_ref());
        self.memory
            .write()
            .await
            .record_interaction(query, &Value::Object(stored));
        stage_trace.push(QueryStage::MemoryUpdated);

        // === METRICS ===
        let execution_time = start_time.elapsed().as_secs_f64();
        self.tracker
            .write()
            .await
            .record_query(query, &analysis, execution_time, &tools_used);
        stage_trace.push(QueryStage::MetricsRecorded);
        stage_trace.push(QueryStage::Complete);

        let main = DecisionResult {
            query_id,
            analysis,
            performance: InvocationPerformance {
                execution_time,
                tools_used,
                memory_context_size: context.similar_memories.len(),
            },
            stage_trace,
        };

        info!(
            %query_id,
            response_confidence = main.confidence(),
            execution_time,
            "Agent invocation completed"
        );
        self.telemetry.count("SuccessfulInvocations");

        Ok(PipelineOutput { main, specialized })
    }

    async fn main_analysis(
        &self,
        query: &str,
        context: &EnhancedContext,
        tool_results: &BTreeMap<String, Value>,
    ) -> Result<JsonObject> {
        let prompt = build_main_prompt(query, context, tool_results);

        match self
            .policy
            .call(
                self.backend.as_ref(),
                &self.config.model_id,
                &prompt,
                MAIN_ANALYSIS_MAX_TOKENS,
            )
            .await
        {
            Ok(reply) => {
                info!(response_length = reply.len(), "Model response received");
                Ok(interpret_reply(reply))
            }
            Err(e) => {
                error!(error = %e, model_id = %self.config.model_id, "Main analysis failed");
                self.telemetry.count("ServiceUnavailable");

                if self.config.strict_mode {
                    Err(e)
                } else {
                    warn!("Continuing with degraded analysis");
                    Ok(degraded_analysis())
                }
            }
        }
    }
}

/// A JSON object reply is the analysis; anything else is kept as raw text
fn interpret_reply(reply: String) -> JsonObject {
    match parse_json_object(&reply) {
        Ok(analysis) => analysis,
        Err(e) => {
            debug!(error = %e, "Reply is not a JSON object, keeping raw text");
            let mut analysis = JsonObject::new();
            analysis.insert("raw_analysis".to_string(), Value::String(reply));
            analysis
        }
    }
}

fn degraded_analysis() -> JsonObject {
    let mut analysis = JsonObject::new();
    analysis.insert(
        "raw_analysis".to_string(),
        Value::String(DEGRADED_ANALYSIS.to_string()),
    );
    analysis
}

/// What memory keeps for a query: the main analysis plus any specialized
/// results, without replacing main fields
fn stored_payload(
    analysis: &JsonObject,
    specialized: Option<&BTreeMap<String, SpecializedResult>>,
) -> JsonObject {
    let mut payload = analysis.clone();

    if let Some(results) = specialized {
        if let Ok(value) = serde_json::to_value(results) {
            payload
                .entry("specialized_analysis".to_string())
                .or_insert(value);
        }
    }

    payload
}

fn build_main_prompt(
    query: &str,
    context: &EnhancedContext,
    tool_results: &BTreeMap<String, Value>,
) -> String {
    let focus = QueryFocus::extract(query);

    format!(
        r#"You are an enterprise decision agent analyzing business data. Based on the query and data provided, give a comprehensive business analysis.

Query: {query}

Query focus: {focus}

Data Available:
{data}

Context: {context}

Provide a detailed business analysis addressing:
1. What the data reveals about the current situation
2. Key risk factors and opportunities identified
3. Specific actionable recommendations
4. Expected outcomes and success metrics

Be specific and data-driven in your analysis. Focus on practical business insights.
Respond with a JSON object. Include a "decision" field with your recommended decision and a "confidence" field from 0 to 100."#,
        focus = json!(focus),
        data = pretty_json(tool_results),
        context = pretty_json(context),
    )
}
