//! Enterprise Decision Orchestrator
//!
//! An LLM-backed decision core that:
//! - Keeps bounded conversation and vector memory with similarity retrieval
//! - Lets the model pick data tools, then analyzes the query with their output
//! - Runs specialized risk and financial analyzers concurrently on request
//! - Tracks per-query performance and derives optimization advice
//!
//! PIPELINE:
//! RECEIVED → CONTEXT → TOOLS → MAIN ANALYSIS → [SPECIALIZED] → MEMORY → METRICS → COMPLETE

pub mod agent;
pub mod analytics;
pub mod classifier;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod models;
pub mod planner;
pub mod specialists;
pub mod telemetry;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use agent::Orchestrator;
pub use analytics::{OptimizationAdvisor, PerformanceSummary, PerformanceTracker};
pub use classifier::{DecisionCategory, QueryCategory};
pub use config::OrchestratorConfig;
pub use error::OrchestrationError;
pub use models::*;
pub use telemetry::Telemetry;
pub use tools::ToolId;
