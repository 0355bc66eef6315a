//! Error types for the decision orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Core Pipeline Errors
    // =============================

    /// LLM or data backend call failed (transport, auth, rate limit, timeout)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Reply was not valid JSON or violated the expected schema
    #[error("Schema parse error: {0}")]
    SchemaParse(String),

    /// Tool id outside the fixed catalogue
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
