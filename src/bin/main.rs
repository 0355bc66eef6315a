use enterprise_decision_orchestrator::{
    llm::{GeminiBackend, LlmBackend, ScriptedBackend, ScriptedReply},
    tools::{DataCategory, InMemoryDataSource},
    Orchestrator, OrchestratorConfig, PerformanceSummary, Telemetry,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SAMPLE_QUERIES: [&str; 3] = [
    "Which customers are at risk of churning this quarter?",
    "Show me support ticket patterns",
    "What is our Q4 revenue outlook?",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Enterprise Decision Orchestrator starting");

    let config = OrchestratorConfig::from_env()?;

    let backend: Arc<dyn LlmBackend> = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Arc::new(GeminiBackend::new(key)?),
        _ => {
            warn!("GEMINI_API_KEY not set, using the offline scripted backend");
            Arc::new(offline_backend())
        }
    };

    let orchestrator = Orchestrator::new(config, backend, Arc::new(sample_data()), Telemetry::tracing())?;

    for query in SAMPLE_QUERIES {
        let result = orchestrator.orchestrate(query).await?;

        println!("\n=== {} ===", query);
        println!("Query ID: {}", result.main.query_id);
        println!("Confidence: {:.0}", result.main.confidence());
        println!(
            "Tools: {:?} ({:.2}s)",
            result.main.performance.tools_used, result.main.performance.execution_time
        );
        println!("{}", serde_json::to_string_pretty(&result.merged_payload())?);
    }

    println!("\n=== PERFORMANCE ===");
    match orchestrator.performance_summary().await {
        PerformanceSummary::NoData => println!("No queries recorded"),
        PerformanceSummary::Report(report) => {
            println!(
                "{} queries, avg {:.2}s, avg confidence {:.1}, grade {}",
                report.total_queries,
                report.avg_response_time,
                report.avg_confidence,
                report.performance_grade
            );
        }
    }

    for rec in orchestrator.optimization_recommendations().await {
        println!("- [{:?}] {}: {}", rec.priority, rec.issue, rec.recommendation);
    }

    Ok(())
}

fn sample_data() -> InMemoryDataSource {
    InMemoryDataSource::new()
        .with_records(
            DataCategory::Customer,
            vec![
                json!({"customer_id": "C-1001", "segment": "enterprise", "churn_risk": 0.72, "satisfaction": 6.1}),
                json!({"customer_id": "C-1002", "segment": "mid-market", "churn_risk": 0.18, "satisfaction": 8.4}),
            ],
        )
        .with_records(
            DataCategory::Support,
            vec![
                json!({"ticket_id": "T-501", "customer_id": "C-1001", "severity": "high", "resolution_hours": 52}),
                json!({"ticket_id": "T-502", "customer_id": "C-1002", "severity": "low", "resolution_hours": 4}),
            ],
        )
        .with_records(
            DataCategory::Financial,
            vec![
                json!({"period": "Q3", "revenue": 1_240_000, "overdue_payments": 3}),
                json!({"period": "Q4", "revenue": 1_310_000, "overdue_payments": 5}),
            ],
        )
}

/// Canned replies so the demo runs without network access
fn offline_backend() -> ScriptedBackend {
    ScriptedBackend::replying("customer_data")
        .on(
            "risk analysis expert",
            ScriptedReply::Text(
                json!({
                    "risk_level": "medium",
                    "probability": 0.4,
                    "impact_score": 6,
                    "mitigation_strategies": ["Proactive account reviews"],
                    "risk_factors": ["Slow ticket resolution"]
                })
                .to_string(),
            ),
        )
        .on(
            "financial analysis expert",
            ScriptedReply::Text(
                json!({
                    "revenue_impact": 85000,
                    "cost_analysis": {"implementation_cost": 20000, "operational_cost": 8000, "savings": 30000},
                    "roi": 2.1,
                    "payback_period": 9,
                    "financial_risks": ["Discount dilution"],
                    "recommendations": ["Target high-value accounts first"]
                })
                .to_string(),
            ),
        )
        .on(
            "enterprise decision agent",
            ScriptedReply::Text(
                json!({
                    "decision": "Launch a retention program for high-risk enterprise accounts",
                    "confidence": 78,
                    "analysis": "Churn risk concentrates in accounts with slow support resolution"
                })
                .to_string(),
            ),
        )
}
