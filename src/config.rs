//! Orchestrator configuration
//!
//! Every field has a default and can be overridden
//! through `ORCHESTRATOR_*` environment variables.

use crate::error::OrchestrationError;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL_ID: &str = "gemini-2.0-flash";

/// Upper bound on `max_retries`
pub const MAX_RETRIES_LIMIT: u32 = 10;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Model passed to every backend call
    pub model_id: String,
    /// Vector memory capacity (FIFO eviction beyond this)
    pub max_memories: usize,
    /// Conversation log bound
    pub history_limit: usize,
    /// Bound on each decision pattern bucket
    pub pattern_limit: usize,
    /// Per backend call timeout
    pub call_timeout: Duration,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries
    pub retry_backoff: Duration,
    /// Surface main analysis failures instead of returning a degraded payload
    pub strict_mode: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            max_memories: 100,
            history_limit: 1_000,
            pattern_limit: 500,
            call_timeout: Duration::from_secs(30),
            max_retries: 0,
            retry_backoff: Duration::from_millis(250),
            strict_mode: false,
        }
    }
}

impl OrchestratorConfig {
    /// Start from defaults and apply environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(model) = env::var("ORCHESTRATOR_MODEL_ID") {
            if !model.trim().is_empty() {
                config.model_id = model.trim().to_string();
            }
        }
        if let Some(v) = parse_var::<usize>("ORCHESTRATOR_MAX_MEMORIES")? {
            config.max_memories = v;
        }
        if let Some(v) = parse_var::<usize>("ORCHESTRATOR_HISTORY_LIMIT")? {
            config.history_limit = v;
        }
        if let Some(v) = parse_var::<usize>("ORCHESTRATOR_PATTERN_LIMIT")? {
            config.pattern_limit = v;
        }
        if let Some(v) = parse_var::<u64>("ORCHESTRATOR_CALL_TIMEOUT_SECS")? {
            config.call_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_var::<u32>("ORCHESTRATOR_MAX_RETRIES")? {
            config.max_retries = v;
        }
        if let Some(v) = parse_var::<bool>("ORCHESTRATOR_STRICT_MODE")? {
            config.strict_mode = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_id.is_empty() {
            return Err(OrchestrationError::Config("model_id must not be empty".to_string()));
        }
        for (name, capacity) in [
            ("max_memories", self.max_memories),
            ("history_limit", self.history_limit),
            ("pattern_limit", self.pattern_limit),
        ] {
            if capacity == 0 {
                return Err(OrchestrationError::Config(format!("{} must be at least 1", name)));
            }
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(OrchestrationError::Config(format!(
                "max_retries {} exceeds the limit of {}",
                self.max_retries, MAX_RETRIES_LIMIT
            )));
        }
        if self.call_timeout.is_zero() {
            return Err(OrchestrationError::Config("call_timeout must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| OrchestrationError::Config(format!("{} has invalid value '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
