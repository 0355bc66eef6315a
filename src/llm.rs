//! LLM inference capability
//!
//! `LlmBackend` is the seam the core talks to: a prompt goes in, reply text
//! comes out. Every call from the core goes through a `CallPolicy` so it is
//! bounded by a timeout and, optionally, retried with backoff.
//!
//! `GeminiBackend` is the HTTP implementation (connection-pooled reqwest
//! client). `ScriptedBackend` answers from fixed rules and never touches the
//! network.

use crate::config::OrchestratorConfig;
use crate::error::OrchestrationError;
use crate::models::JsonObject;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Trait for text generation backends
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Send `prompt` to `model_id` and return the reply text.
    /// Transport, auth and rate-limit failures are `ServiceUnavailable`.
    async fn invoke(&self, model_id: &str, prompt: &str, max_tokens: u32) -> Result<String>;
}

//
// ================= Call policy =================
//

/// Timeout and retry rules applied around every backend call
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}

impl CallPolicy {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            timeout: config.call_timeout,
            max_retries: config.max_retries,
            backoff: config.retry_backoff,
        }
    }

    /// Invoke the backend; a timeout counts as a service failure
    pub async fn call(
        &self,
        backend: &dyn LlmBackend,
        model_id: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String> {
        let attempts = self.max_retries.saturating_add(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.backoff.saturating_mul(1 << (attempt - 1).min(16));
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying backend call");
                tokio::time::sleep(delay).await;
            }

            let outcome = tokio::time::timeout(
                self.timeout,
                backend.invoke(model_id, prompt, max_tokens),
            )
            .await
            .unwrap_or_else(|_| {
                Err(OrchestrationError::ServiceUnavailable(format!(
                    "backend call timed out after {:?}",
                    self.timeout
                )))
            });

            match outcome {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    warn!(attempt, error = %e, "Backend call failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            OrchestrationError::ServiceUnavailable("no attempt was made".to_string())
        }))
    }
}

//
// ================= Prompt and reply helpers =================
//

/// Strip an optional Markdown ```json fence around a reply
pub fn strip_json_fence(reply: &str) -> &str {
    reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Parse a reply as a JSON object
pub fn parse_json_object(reply: &str) -> Result<JsonObject> {
    match serde_json::from_str::<Value>(strip_json_fence(reply))? {
        Value::Object(map) => Ok(map),
        other => Err(OrchestrationError::SchemaParse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Pretty JSON for embedding in prompts
pub fn pretty_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//
// ================= Gemini =================
//

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn invoke(&self, model_id: &str, prompt: &str, max_tokens: u32) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(OrchestrationError::ServiceUnavailable(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}/{}:generateContent?key={}", self.base_url, model_id, self.api_key);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: max_tokens,
            },
        };

        debug!(model_id, prompt_len = prompt.len(), "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                OrchestrationError::ServiceUnavailable(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(OrchestrationError::ServiceUnavailable(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            OrchestrationError::ServiceUnavailable(format!("Gemini response unreadable: {}", e))
        })?;

        gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                OrchestrationError::ServiceUnavailable("Empty response from Gemini".to_string())
            })
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

//
// ================= Scripted =================
//

/// What a scripted backend does when a rule matches
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Fail(String),
    /// Sleep before answering; used to exercise timeouts
    Delay(Duration, String),
    /// Fail while fewer than `n` calls have reached the backend, then reply
    FailTimes(usize, String),
}

/// Offline backend answering from ordered "prompt contains" rules
pub struct ScriptedBackend {
    rules: Vec<(String, ScriptedReply)>,
    fallback: ScriptedReply,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(fallback: ScriptedReply) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Reply with `text` to any prompt not matched by a rule
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(ScriptedReply::Text(text.into()))
    }

    /// Fail every prompt not matched by a rule
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::new(ScriptedReply::Fail(reason.into()))
    }

    /// First matching rule wins
    pub fn on(mut self, prompt_fragment: impl Into<String>, reply: ScriptedReply) -> Self {
        self.rules.push((prompt_fragment.into(), reply));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, _model_id: &str, prompt: &str, _max_tokens: u32) -> Result<String> {
        let calls_before = self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = self
            .rules
            .iter()
            .find(|(fragment, _)| prompt.contains(fragment.as_str()))
            .map(|(_, reply)| reply)
            .unwrap_or(&self.fallback);

        match reply {
            ScriptedReply::Text(text) => Ok(text.clone()),
            ScriptedReply::Fail(reason) => Err(OrchestrationError::ServiceUnavailable(reason.clone())),
            ScriptedReply::Delay(delay, text) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
            ScriptedReply::FailTimes(n, text) => {
                if calls_before < *n {
                    Err(OrchestrationError::ServiceUnavailable(format!(
                        "transient failure {} of {}",
                        calls_before + 1,
                        n
                    )))
                } else {
                    Ok(text.clone())
                }
            }
        }
    }
}
