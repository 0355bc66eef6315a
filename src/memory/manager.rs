//! Memory manager
//!
//! Owns the conversation log, the vector memory and the decision pattern
//! table, and assembles the enriched context handed to the main analysis.

use crate::classifier::DecisionCategory;
use crate::config::OrchestratorConfig;
use crate::memory::history::ConversationLog;
use crate::memory::vector_store::VectorMemoryStore;
use crate::models::{DecisionPatternEntry, Interaction, JsonObject, SimilarMemory};
use crate::telemetry::Telemetry;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use tracing::info;

/// Interactions included verbatim in the enriched context
const RECENT_HISTORY: usize = 3;
/// Similarity hits included in the enriched context
const SIMILAR_MEMORIES: usize = 3;

pub type DecisionPatterns = BTreeMap<DecisionCategory, Vec<DecisionPatternEntry>>;

/// Context assembled for one query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnhancedContext {
    /// Most recent last
    pub recent_history: Vec<Interaction>,
    pub similar_memories: Vec<SimilarMemory>,
    pub decision_patterns: DecisionPatterns,
    pub context_data: JsonObject,
}

pub struct MemoryManager {
    history: ConversationLog,
    vector_memory: VectorMemoryStore,
    context_data: JsonObject,
    decision_patterns: BTreeMap<DecisionCategory, VecDeque<DecisionPatternEntry>>,
    pattern_limit: usize,
    telemetry: Telemetry,
}

impl MemoryManager {
    pub fn new(config: &OrchestratorConfig, telemetry: Telemetry) -> Self {
        Self {
            history: ConversationLog::new(config.history_limit),
            vector_memory: VectorMemoryStore::new(config.max_memories),
            context_data: JsonObject::new(),
            decision_patterns: BTreeMap::new(),
            pattern_limit: config.pattern_limit.max(1),
            telemetry,
        }
    }

    /// Record a completed interaction in every store
    pub fn record_interaction(&mut self, query: &str, response: &Value) {
        self.history.push(query, response);
        self.vector_memory.add(query, response, &self.context_data);

        if let Some(decision) = response.get("decision") {
            let category = DecisionCategory::classify(query);
            let confidence = response
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);

            let bucket = self.decision_patterns.entry(category).or_default();
            bucket.push_back(DecisionPatternEntry {
                query: query.to_string(),
                decision: decision.clone(),
                confidence,
            });
            while bucket.len() > self.pattern_limit {
                bucket.pop_front();
            }
        }
    }

    /// Recent history, similar memories, decision patterns and context data
    pub fn enhanced_context(&self, query: &str) -> EnhancedContext {
        let context = EnhancedContext {
            recent_history: self.history.recent(RECENT_HISTORY),
            similar_memories: self.vector_memory.find_similar(query, SIMILAR_MEMORIES),
            decision_patterns: self.decision_patterns(),
            context_data: self.context_data.clone(),
        };

        info!(
            similar_memories_count = context.similar_memories.len(),
            decision_patterns_count = self.decision_patterns.len(),
            "Enhanced context retrieved"
        );
        self.telemetry.event(
            "enhanced_context_retrieved",
            json!({
                "similar_memories_count": context.similar_memories.len(),
                "decision_patterns_count": self.decision_patterns.len(),
            }),
        );

        context
    }

    /// Set a free-form context value; later records snapshot it
    pub fn set_context(&mut self, key: impl Into<String>, value: Value) {
        self.context_data.insert(key.into(), value);
    }

    pub fn decision_patterns(&self) -> DecisionPatterns {
        self.decision_patterns
            .iter()
            .map(|(category, entries)| (*category, entries.iter().cloned().collect()))
            .collect()
    }

    pub fn interaction_count(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &ConversationLog {
        &self.history
    }

    pub fn vector_memory(&self) -> &VectorMemoryStore {
        &self.vector_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::RecordingSink;
    use std::sync::Arc;

    fn manager() -> MemoryManager {
        MemoryManager::new(&OrchestratorConfig::default(), Telemetry::disabled())
    }

    #[test]
    fn test_empty_memory_degrades_to_empty_context() {
        let context = manager().enhanced_context("anything at all");
        assert!(context.recent_history.is_empty());
        assert!(context.similar_memories.is_empty());
        assert!(context.decision_patterns.is_empty());
        assert!(context.context_data.is_empty());
    }

    #[test]
    fn test_decisions_are_bucketed() {
        let mut memory = manager();
        memory.record_interaction(
            "Which customers risk churn?",
            &json!({"decision": "launch retention offers", "confidence": 82}),
        );
        memory.record_interaction(
            "Show me support ticket patterns",
            &json!({"decision": "add tier-2 staff"}),
        );
        memory.record_interaction("Summarize the quarter", &json!({"raw_analysis": "flat"}));

        let patterns = memory.decision_patterns();
        assert_eq!(patterns.len(), 2);

        let retention = &patterns[&DecisionCategory::CustomerRetention];
        assert_eq!(retention[0].decision, json!("launch retention offers"));
        assert_eq!(retention[0].confidence, 82.0);

        let support = &patterns[&DecisionCategory::SupportOptimization];
        assert_eq!(support[0].confidence, 0.0);

        assert_eq!(memory.interaction_count(), 3);
    }

    #[test]
    fn test_context_has_last_three_and_similar() {
        let mut memory = manager();
        for q in [
            "customer churn drivers",
            "quarterly revenue forecast",
            "support backlog",
            "marketing spend",
        ] {
            memory.record_interaction(q, &json!({"decision": "review"}));
        }

        let context = memory.enhanced_context("customer churn");
        let recent: Vec<&str> = context.recent_history.iter().map(|i| i.query.as_str()).collect();
        assert_eq!(recent, vec!["quarterly revenue forecast", "support backlog", "marketing spend"]);

        assert!(!context.similar_memories.is_empty());
        assert!(context.similar_memories.len() <= 3);
        assert_eq!(context.similar_memories[0].record.query, "customer churn drivers");
    }

    #[test]
    fn test_pattern_bucket_bound() {
        let config = OrchestratorConfig {
            pattern_limit: 2,
            ..OrchestratorConfig::default()
        };
        let mut memory = MemoryManager::new(&config, Telemetry::disabled());
        for i in 0..5 {
            memory.record_interaction("revenue plan", &json!({"decision": i}));
        }

        let bucket = &memory.decision_patterns()[&DecisionCategory::FinancialDecision];
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].decision, json!(3));
    }

    #[test]
    fn test_context_data_snapshot_and_event() {
        let sink = Arc::new(RecordingSink::new());
        let mut memory = MemoryManager::new(&OrchestratorConfig::default(), Telemetry::new(sink.clone()));

        memory.set_context("region", json!("emea"));
        memory.record_interaction("hiring plan", &json!({}));

        let record = memory.vector_memory().records().next().unwrap();
        assert_eq!(record.context_snapshot["region"], "emea");

        let context = memory.enhanced_context("hiring plan");
        assert_eq!(context.context_data["region"], "emea");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "enhanced_context_retrieved");
        assert_eq!(events[0].1["decision_patterns_count"], 0);
    }
}
