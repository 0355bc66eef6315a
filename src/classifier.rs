//! Query Classifiers
//!
//! Two independent keyword classifiers over query text:
//! - `DecisionCategory`: buckets decision patterns kept in memory
//! - `QueryCategory`: labels query metrics for analytics
//!
//! The two taxonomies overlap but are not the same ("retention" or "ticket"
//! only count for decision patterns). Keep them separate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision pattern label (first match wins)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DecisionCategory {
    CustomerRetention,
    FinancialDecision,
    SupportOptimization,
    GeneralBusiness,
}

/// Analytics label (first match wins)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    ChurnAnalysis,
    FinancialAnalysis,
    SupportAnalysis,
    General,
}

/// Static keyword tables, checked in order
const DECISION_RULES: &[(&[&str], DecisionCategory)] = &[
    (&["churn", "retention"], DecisionCategory::CustomerRetention),
    (&["revenue", "financial"], DecisionCategory::FinancialDecision),
    (&["support", "ticket"], DecisionCategory::SupportOptimization),
];

const QUERY_RULES: &[(&str, QueryCategory)] = &[
    ("churn", QueryCategory::ChurnAnalysis),
    ("revenue", QueryCategory::FinancialAnalysis),
    ("support", QueryCategory::SupportAnalysis),
];

impl DecisionCategory {
    pub fn classify(query: &str) -> Self {
        let lowered = query.to_lowercase();

        DECISION_RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|(_, category)| *category)
            .unwrap_or(DecisionCategory::GeneralBusiness)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionCategory::CustomerRetention => "customer_retention",
            DecisionCategory::FinancialDecision => "financial_decision",
            DecisionCategory::SupportOptimization => "support_optimization",
            DecisionCategory::GeneralBusiness => "general_business",
        }
    }
}

impl QueryCategory {
    pub fn classify(query: &str) -> Self {
        let lowered = query.to_lowercase();

        QUERY_RULES
            .iter()
            .find(|(kw, _)| lowered.contains(kw))
            .map(|(_, category)| *category)
            .unwrap_or(QueryCategory::General)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryCategory::ChurnAnalysis => "churn_analysis",
            QueryCategory::FinancialAnalysis => "financial_analysis",
            QueryCategory::SupportAnalysis => "support_analysis",
            QueryCategory::General => "general",
        }
    }
}

impl fmt::Display for DecisionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
