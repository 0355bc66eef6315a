//! Optimization advisor
//!
//! Stateless rules over a `PerformanceSummary`.

use crate::analytics::tracker::PerformanceSummary;
use crate::models::{OptimizationRecommendation, Priority, RecommendationType};

const SLOW_RESPONSE_SECS: f64 = 3.0;
const MIN_TOOL_EFFICIENCY: f64 = 50.0;
const MIN_CONFIDENCE: f64 = 75.0;

pub struct OptimizationAdvisor;

impl OptimizationAdvisor {
    pub fn recommend(summary: &PerformanceSummary) -> Vec<OptimizationRecommendation> {
        let report = match summary {
            PerformanceSummary::NoData => {
                return vec![recommendation(
                    RecommendationType::Info,
                    Priority::Low,
                    "Insufficient data for optimization",
                    "Run more queries before requesting optimization advice",
                    "",
                )]
            }
            PerformanceSummary::Report(report) => report,
        };

        let mut recommendations = Vec::new();

        if report.avg_response_time > SLOW_RESPONSE_SECS {
            recommendations.push(recommendation(
                RecommendationType::Performance,
                Priority::High,
                "Slow response times",
                "Consider tool caching or parallel execution",
                "30-50% faster responses",
            ));
        }

        let slow_tools: Vec<String> = report
            .tool_efficiency
            .iter()
            .filter(|(_, eff)| eff.efficiency_score < MIN_TOOL_EFFICIENCY)
            .map(|(tool, _)| tool.to_string())
            .collect();

        if !slow_tools.is_empty() {
            recommendations.push(recommendation(
                RecommendationType::Tools,
                Priority::Medium,
                &format!("Inefficient tools: {}", slow_tools.join(", ")),
                "Optimize data retrieval or consider tool replacement",
                "20-30% better tool performance",
            ));
        }

        if report.avg_confidence < MIN_CONFIDENCE {
            recommendations.push(recommendation(
                RecommendationType::Accuracy,
                Priority::High,
                "Low decision confidence",
                "Enhance training data or adjust model parameters",
                "10-15% higher confidence scores",
            ));
        }

        recommendations
    }
}

fn recommendation(
    kind: RecommendationType,
    priority: Priority,
    issue: &str,
    recommendation: &str,
    expected_improvement: &str,
) -> OptimizationRecommendation {
    OptimizationRecommendation {
        kind,
        priority,
        issue: issue.to_string(),
        recommendation: recommendation.to_string(),
        expected_improvement: expected_improvement.to_string(),
    }
}
