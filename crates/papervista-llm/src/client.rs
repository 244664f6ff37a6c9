//! Generative-text clients.

use crate::error::{FallbackError, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;

/// A service that turns a prompt into free text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Whether the client has what it needs to make a request.
    fn is_configured(&self) -> bool;

    /// Complete `prompt` under the given system instruction.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Settings for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct GeneratorConfig {
    /// Bearer credential. `None` leaves the generator unconfigured.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Upper bound on one fallback generation, including the network call.
    pub timeout: Duration,
}

impl GeneratorConfig {
    pub const DEFAULT_BASE_URL: &'static str =
        "https://generativelanguage.googleapis.com/v1beta/openai/";
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }
}

// The credential never appears in debug output
impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Chat completions client for OpenAI-compatible services (Gemini's OpenAI
/// endpoint by default).
pub struct OpenAiCompatibleGenerator {
    config: GeneratorConfig,
    client: reqwest::Client,
}

impl OpenAiCompatibleGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_payload(&self, system: &str, prompt: &str) -> Value {
        json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.0,
        })
    }

    fn parse_response(body: &Value) -> Result<String> {
        body.get("choices")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                FallbackError::InvalidResponse("no choices[0].message.content".to_string())
            })
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleGenerator {
    fn is_configured(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty())
        else {
            return Err(FallbackError::NotConfigured);
        };

        tracing::info!(model = %self.config.model, "Requesting fallback citation");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&self.build_payload(system, prompt))
            .send()
            .await
            .map_err(|e| FallbackError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FallbackError::Network(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(FallbackError::Api {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| FallbackError::InvalidResponse(e.to_string()))?;
        Self::parse_response(&body)
    }
}
