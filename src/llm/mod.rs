//! Narrative generation port and its Groq-backed implementation.
//! The narrator is an optional capability: it is resolved once per run
//! from configuration, and every stage that uses it carries a documented
//! deterministic fallback for when it is absent or erroring.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

use crate::config::Config;
use crate::data::{PipelineError, PipelineResult};

/// Free-text generation capability used for news summaries and analyst
/// narratives. Implementations make exactly one attempt per call.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> PipelineResult<String>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Groq chat-completions client (OpenAI-compatible endpoint)
pub struct GroqClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    timeout_seconds: u64,
}

impl GroqClient {
    const ENDPOINT: &'static str = "https://api.groq.com/openai/v1/chat/completions";

    pub fn new(api_key: String, model: String, timeout_seconds: u64) -> PipelineResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent("stockwatch/0.1.0")
            .build()
            .map_err(PipelineError::Fetch)?;

        Ok(Self {
            http_client,
            api_key,
            model,
            timeout_seconds,
        })
    }

    /// Resolve the narrator capability from configuration.
    /// Returns `None` when no API key is configured; callers fall back to
    /// their degraded text paths.
    pub fn from_config(config: &Config) -> PipelineResult<Option<Self>> {
        match &config.groq_api_key {
            Some(key) => {
                info!(model = %config.groq_model, "Narrative generator configured");
                Ok(Some(Self::new(
                    key.clone(),
                    config.groq_model.clone(),
                    config.request_timeout_seconds,
                )?))
            }
            None => {
                tracing::warn!("GROQ_API_KEY not set, narrative generation disabled");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Narrator for GroqClient {
    async fn generate(&self, system: &str, prompt: &str) -> PipelineResult<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
        });

        let response = timeout(
            Duration::from_secs(self.timeout_seconds),
            self.http_client
                .post(Self::ENDPOINT)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send(),
        )
        .await
        .map_err(|_| PipelineError::Timeout {
            seconds: self.timeout_seconds,
        })?
        .map_err(|e| PipelineError::NarrativeUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::NarrativeUnavailable(format!(
                "Groq API error (status {status}): {message}"
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::NarrativeUnavailable(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                PipelineError::NarrativeUnavailable("Empty completion response".to_string())
            })?;

        Ok(content.trim().to_string())
    }
}
