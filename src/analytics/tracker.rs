//! Performance tracking
//!
//! One `QueryMetric` per completed query, plus per-tool timing samples.
//! Summaries are recomputed from scratch on every call.

use crate::classifier::QueryCategory;
use crate::models::{response_confidence, JsonObject, QueryMetric};
use crate::telemetry::{MetricUnit, Telemetry};
use crate::tools::ToolId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Below this average response time the time score is perfect
const FAST_RESPONSE_SECS: f64 = 2.0;
/// Time score lost per second above `FAST_RESPONSE_SECS`
const SLOW_PENALTY_PER_SEC: f64 = 20.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PerformanceGrade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
}

impl PerformanceGrade {
    /// Grade from the mean of the time score and the confidence score
    pub fn from_averages(avg_response_time: f64, avg_confidence: f64) -> Self {
        let overall = (time_score(avg_response_time) + avg_confidence) / 2.0;

        if overall >= 90.0 {
            PerformanceGrade::APlus
        } else if overall >= 80.0 {
            PerformanceGrade::A
        } else if overall >= 70.0 {
            PerformanceGrade::B
        } else if overall >= 60.0 {
            PerformanceGrade::C
        } else {
            PerformanceGrade::D
        }
    }
}

impl fmt::Display for PerformanceGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PerformanceGrade::APlus => "A+",
            PerformanceGrade::A => "A",
            PerformanceGrade::B => "B",
            PerformanceGrade::C => "C",
            PerformanceGrade::D => "D",
        };
        write!(f, "{}", s)
    }
}

/// 100 under two seconds, then 20 points lost per extra second, floored at 0
pub fn time_score(avg_response_time: f64) -> f64 {
    if avg_response_time < FAST_RESPONSE_SECS {
        100.0
    } else {
        (100.0 - (avg_response_time - FAST_RESPONSE_SECS) * SLOW_PENALTY_PER_SEC).max(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolEfficiency {
    pub avg_time: f64,
    pub usage_count: usize,
    /// `100 / avg_time`; `f64::MAX` when the average time is zero
    pub efficiency_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceReport {
    pub total_queries: usize,
    pub avg_response_time: f64,
    pub avg_confidence: f64,
    /// Keyed in catalogue order, whatever order the tools were first used in
    pub tool_efficiency: BTreeMap<ToolId, ToolEfficiency>,
    pub query_distribution: BTreeMap<QueryCategory, usize>,
    pub performance_grade: PerformanceGrade,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PerformanceSummary {
    NoData,
    #[serde(rename = "ok")]
    Report(PerformanceReport),
}

impl PerformanceSummary {
    pub fn report(&self) -> Option<&PerformanceReport> {
        match self {
            PerformanceSummary::Report(r) => Some(r),
            PerformanceSummary::NoData => None,
        }
    }
}

pub struct PerformanceTracker {
    metrics: Vec<QueryMetric>,
    tool_samples: BTreeMap<ToolId, Vec<f64>>,
    telemetry: Telemetry,
}

impl PerformanceTracker {
    pub fn new(telemetry: Telemetry) -> Self {
        Self {
            metrics: Vec::new(),
            tool_samples: BTreeMap::new(),
            telemetry,
        }
    }

    /// Record one completed query.
    ///
    /// Each used tool is credited with `elapsed / tool count`; this is an
    /// even split of the total, not a measurement of the tool itself.
    pub fn record_query(
        &mut self,
        query: &str,
        response: &JsonObject,
        elapsed_seconds: f64,
        tools_used: &[ToolId],
    ) {
        let confidence = response_confidence(response);

        self.metrics.push(QueryMetric {
            query: query.to_string(),
            response_time: elapsed_seconds,
            confidence,
            tools_used: tools_used.to_vec(),
            decision_type: QueryCategory::classify(query),
            recorded_at: Utc::now(),
        });

        let share = elapsed_seconds / tools_used.len().max(1) as f64;
        for tool in tools_used {
            self.tool_samples.entry(*tool).or_default().push(share);
        }

        self.telemetry
            .metric("QueryResponseTime", MetricUnit::Seconds, elapsed_seconds);
        self.telemetry
            .metric("DecisionConfidence", MetricUnit::Percent, confidence);
        self.telemetry
            .metric("ToolsUsed", MetricUnit::Count, tools_used.len() as f64);
    }

    pub fn summary(&self) -> PerformanceSummary {
        if self.metrics.is_empty() {
            return PerformanceSummary::NoData;
        }

        let total = self.metrics.len() as f64;
        let avg_response_time = self.metrics.iter().map(|m| m.response_time).sum::<f64>() / total;
        let avg_confidence = self.metrics.iter().map(|m| m.confidence).sum::<f64>() / total;

        let tool_efficiency = self
            .tool_samples
            .iter()
            .filter(|(_, times)| !times.is_empty())
            .map(|(tool, times)| {
                let avg_time = times.iter().sum::<f64>() / times.len() as f64;
                let efficiency_score = if avg_time > 0.0 {
                    100.0 / avg_time
                } else {
                    f64::MAX
                };
                (
                    *tool,
                    ToolEfficiency {
                        avg_time,
                        usage_count: times.len(),
                        efficiency_score,
                    },
                )
            })
            .collect();

        let mut query_distribution = BTreeMap::new();
        for metric in &self.metrics {
            *query_distribution.entry(metric.decision_type).or_insert(0) += 1;
        }

        PerformanceSummary::Report(PerformanceReport {
            total_queries: self.metrics.len(),
            avg_response_time,
            avg_confidence,
            tool_efficiency,
            query_distribution,
            performance_grade: PerformanceGrade::from_averages(avg_response_time, avg_confidence),
        })
    }

    pub fn query_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn metrics(&self) -> &[QueryMetric] {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::RecordingSink;
    use serde_json::json;
    use std::sync::Arc;

    fn response(confidence: f64) -> JsonObject {
        json!({"decision": "go", "confidence": confidence})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_no_data_sentinel() {
        let tracker = PerformanceTracker::new(Telemetry::disabled());
        let summary = tracker.summary();
        assert_eq!(summary, PerformanceSummary::NoData);
        assert_eq!(serde_json::to_value(&summary).unwrap(), json!({"status": "no_data"}));
    }

    #[test]
    fn test_single_fast_confident_query_is_a_plus() {
        let mut tracker = PerformanceTracker::new(Telemetry::disabled());
        tracker.record_query("Which customers risk churn?", &response(90.0), 1.5, &[ToolId::CustomerData]);

        let summary = tracker.summary();
        let report = summary.report().unwrap();
        assert_eq!(report.total_queries, 1);
        assert_eq!(report.avg_response_time, 1.5);
        assert_eq!(time_score(report.avg_response_time), 100.0);
        assert_eq!(report.performance_grade, PerformanceGrade::APlus);
        assert_eq!(report.query_distribution[&QueryCategory::ChurnAnalysis], 1);
    }

    #[test]
    fn test_tool_time_is_split_evenly() {
        let mut tracker = PerformanceTracker::new(Telemetry::disabled());
        tracker.record_query(
            "revenue and support",
            &response(80.0),
            3.0,
            &[ToolId::FinancialMetrics, ToolId::SupportAnalysis],
        );
        tracker.record_query("revenue", &response(60.0), 1.0, &[ToolId::FinancialMetrics]);

        let summary = tracker.summary();
        let report = summary.report().unwrap();

        let financial = &report.tool_efficiency[&ToolId::FinancialMetrics];
        assert_eq!(financial.usage_count, 2);
        assert!((financial.avg_time - 1.25).abs() < 1e-9);
        assert!((financial.efficiency_score - 80.0).abs() < 1e-9);

        let support = &report.tool_efficiency[&ToolId::SupportAnalysis];
        assert!((support.avg_time - 1.5).abs() < 1e-9);
        assert!(!report.tool_efficiency.contains_key(&ToolId::CustomerData));
        assert_eq!(report.avg_confidence, 70.0);
    }

    #[test]
    fn test_zero_time_tool_is_maximally_efficient() {
        let mut tracker = PerformanceTracker::new(Telemetry::disabled());
        tracker.record_query("instant", &response(100.0), 0.0, &[ToolId::CustomerData]);

        let summary = tracker.summary();
        let report = summary.report().unwrap();
        assert_eq!(report.tool_efficiency[&ToolId::CustomerData].efficiency_score, f64::MAX);
    }

    #[test]
    fn test_no_tools_still_recorded() {
        let mut tracker = PerformanceTracker::new(Telemetry::disabled());
        tracker.record_query("hello", &JsonObject::new(), 0.5, &[]);

        let summary = tracker.summary();
        let report = summary.report().unwrap();
        assert!(report.tool_efficiency.is_empty());
        assert_eq!(report.avg_confidence, 0.0);
    }

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(PerformanceGrade::from_averages(1.0, 80.0), PerformanceGrade::APlus);
        assert_eq!(PerformanceGrade::from_averages(1.0, 60.0), PerformanceGrade::A);
        // time score 60 at 4s
        assert_eq!(PerformanceGrade::from_averages(4.0, 80.0), PerformanceGrade::B);
        assert_eq!(PerformanceGrade::from_averages(4.0, 60.0), PerformanceGrade::C);
        assert_eq!(PerformanceGrade::from_averages(10.0, 50.0), PerformanceGrade::D);
        assert_eq!(time_score(10.0), 0.0);
        assert_eq!(PerformanceGrade::APlus.to_string(), "A+");
    }

    #[test]
    fn test_counters_emitted() {
        let sink = Arc::new(RecordingSink::new());
        let mut tracker = PerformanceTracker::new(Telemetry::new(sink.clone()));
        tracker.record_query(
            "support",
            &response(75.0),
            2.5,
            &[ToolId::SupportAnalysis, ToolId::CustomerData],
        );

        assert_eq!(sink.total("QueryResponseTime"), 2.5);
        assert_eq!(sink.total("DecisionConfidence"), 75.0);
        assert_eq!(sink.total("ToolsUsed"), 2.0);
    }
}
