//! Completion provider for OpenAI-compatible chat endpoints

use anyhow::{Context, Result};
use hiring_assistant_sdk::{async_trait, Completion, CompletionError, ResponseFormat};
use serde_json::json;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Extraction wants near-deterministic output; document prose gets more room
const JSON_TEMPERATURE: f64 = 0.1;
const TEXT_TEMPERATURE: f64 = 0.3;

/// `Completion` implementation backed by an OpenAI-compatible API
pub struct OpenAiCompletion {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompletion {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        })
    }

    /// Build from environment: `OPENAI_API_KEY` (required),
    /// `OPENAI_BASE_URL` and `OPENAI_MODEL` (optional overrides)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY is not set - add it to your environment or .env file")?;
        let mut provider = Self::new(
            api_key,
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        )?;
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            provider.base_url = base_url.trim_end_matches('/').to_string();
        }
        Ok(provider)
    }
}

#[async_trait]
impl Completion for OpenAiCompletion {
    async fn complete(
        &self,
        prompt: &str,
        format: ResponseFormat,
    ) -> Result<String, CompletionError> {
        let mut body = json!({
            "model": self.model,
            "temperature": match format {
                ResponseFormat::Json => JSON_TEMPERATURE,
                ResponseFormat::Text => TEXT_TEMPERATURE,
            },
            "messages": [{"role": "user", "content": prompt}],
        });
        if format == ResponseFormat::Json {
            body["response_format"] = json!({"type": "json_object"});
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    CompletionError::Timeout
                } else {
                    CompletionError::Network(err.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(CompletionError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message: message.chars().take(500).collect(),
            });
        }

        let payload: serde_json::Value = response.json().await.map_err(|err| {
            CompletionError::Api {
                status: status.as_u16(),
                message: format!("unreadable response body: {}", err),
            }
        })?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CompletionError::Api {
                status: status.as_u16(),
                message: "response missing choices[0].message.content".to_string(),
            })
    }
}
