//! Query analytics
//!
//! Per-query metrics, aggregate summaries and the rule-based advisor that
//! turns a summary into recommendations.

pub mod advisor;
pub mod tracker;

pub use advisor::OptimizationAdvisor;
pub use tracker::{
    PerformanceGrade, PerformanceReport, PerformanceSummary, PerformanceTracker, ToolEfficiency,
};
