//! OpenAI-compatible `/v1/completions` client.
//!
//! Request: `{model, prompt, max_tokens, temperature}` with a bearer token.
//! Response: an envelope whose `choices[0].text` carries the completion.
//! Any service honouring that contract works; the URL is configurable.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::CompletionConfig;
use crate::error::{BenderError, Result};

use super::CompletionProvider;

/// Longest slice of an error body carried into error messages.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Completion client for OpenAI-style text completion endpoints.
pub struct OpenAiCompletionClient {
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: Client,
}

impl std::fmt::Debug for OpenAiCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompletionClient")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiCompletionClient {
    /// Build a client from injected configuration.
    ///
    /// Fails with [`BenderError::Config`] when no API key is configured.
    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                BenderError::Config(
                    "API key is not set; export OPENAI_API_KEY or set completion.api_key".into(),
                )
            })?
            .to_string();

        let client = Self::build_client(config.request_timeout())?;
        info!(model = %config.model, url = %config.api_url, "Completion client initialized");

        Ok(Self {
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client,
        })
    }

    fn build_client(timeout: Duration) -> Result<Client> {
        Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BenderError::Config(format!("Failed to build HTTP client: {e}")))
    }

    /// Request body for `prompt`.
    pub fn build_request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        })
    }

    /// Pull the first candidate's text out of a completion envelope.
    pub fn extract_text(response: &Value) -> Result<String> {
        let choices = response["choices"].as_array().ok_or_else(|| {
            BenderError::MalformedResponse("response has no `choices` array".into())
        })?;
        let first = choices
            .first()
            .ok_or_else(|| BenderError::MalformedResponse("`choices` is empty".into()))?;
        let text = first["text"].as_str().ok_or_else(|| {
            BenderError::MalformedResponse("first choice has no `text` field".into())
        })?;

        let text = text.trim();
        if text.is_empty() {
            return Err(BenderError::MalformedResponse(
                "first choice has empty text".into(),
            ));
        }
        Ok(text.to_string())
    }

    /// Best human-readable message from an error body.
    fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY_CHARS).collect())
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Sending completion request");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request_body(prompt))
            .send()
            .await
            .map_err(|e| BenderError::Transport(format!("Completion request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BenderError::Transport(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(BenderError::Protocol {
                status: status.as_u16(),
                message: Self::error_message(&body),
            });
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| BenderError::MalformedResponse(format!("Response is not JSON: {e}")))?;
        let text = Self::extract_text(&json)?;
        debug!(response_len = text.len(), "Received completion");
        Ok(text)
    }

    fn name(&self) -> &str {
        "openai-completions"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
