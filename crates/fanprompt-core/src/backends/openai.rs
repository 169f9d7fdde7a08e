//! OpenAI chat-completions backend
//!
//! Also serves Groq and DeepSeek, which speak the same wire format behind a
//! different base URL.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{DEFAULT_TIMEOUT, ModelBackend, http_client};
use crate::provider::Provider;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

/// Known Groq models, used when the catalog cannot be fetched
pub const GROQ_FALLBACK_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "llama-3.1-70b-versatile",
    "llama-3.1-8b-versatile",
    "mixtral-8x7b-32768",
    "gemma-7b-it",
    "qwen-2.5-32b",
];

/// Known DeepSeek models, used when the catalog cannot be fetched
pub const DEEPSEEK_FALLBACK_MODELS: &[&str] = &[
    "deepseek-coder",
    "deepseek-chat",
    "deepseek-reasoner",
    "deepseek-coder-v2",
    "deepseek-reasoner-lite",
];

/// Backend for any OpenAI-compatible endpoint
pub struct OpenAiBackend {
    client: Client,
    provider: Provider,
    api_key: String,
    base_url: String,
    fallback_models: Vec<String>,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("fallback_models", &self.fallback_models.len())
            .finish()
    }
}

impl OpenAiBackend {
    pub fn new(provider: Provider, api_key: String, base_url: String) -> Self {
        Self {
            client: http_client(DEFAULT_TIMEOUT),
            provider,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            fallback_models: Vec::new(),
        }
    }

    /// OpenAI itself: catalog errors propagate
    pub fn openai(api_key: String, base_url: Option<String>) -> Self {
        Self::new(
            Provider::OpenAi,
            api_key,
            base_url.unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
        )
    }

    pub fn groq(api_key: String, base_url: Option<String>) -> Self {
        Self::new(
            Provider::Groq,
            api_key,
            base_url.unwrap_or_else(|| GROQ_BASE_URL.to_string()),
        )
        .with_fallback_models(GROQ_FALLBACK_MODELS)
    }

    pub fn deepseek(api_key: String, base_url: Option<String>) -> Self {
        Self::new(
            Provider::DeepSeek,
            api_key,
            base_url.unwrap_or_else(|| DEEPSEEK_BASE_URL.to_string()),
        )
        .with_fallback_models(DEEPSEEK_FALLBACK_MODELS)
    }

    /// Answer `list_models` with this list when the catalog request fails
    pub fn with_fallback_models(mut self, models: &[&str]) -> Self {
        self.fallback_models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    fn extract_text(resp: ChatCompletionResponse) -> Result<String> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("response had no choices"))?;
        Ok(choice.message.content.unwrap_or_default())
    }

    fn model_ids(resp: ModelListResponse) -> Vec<String> {
        resp.data.into_iter().map(|m| m.id).collect()
    }

    async fn fetch_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("Failed to reach {} model catalog", self.provider))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "{} models request failed with status {}: {}",
                self.provider,
                status,
                error_text
            ));
        }

        let list: ModelListResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} model catalog", self.provider))?;
        Ok(Self::model_ids(list))
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    async fn prompt(&self, text: &str, model: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model,
            messages: vec![WireMessage {
                role: "user",
                content: text,
            }],
            stream: false,
        };

        info!("Sending prompt to {} model: {}", self.provider, model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {} API", self.provider))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "{} API request failed with status {}: {}",
                self.provider,
                status,
                error_text
            ));
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} API response", self.provider))?;

        debug!(
            "{} response: choices={}",
            self.provider,
            api_response.choices.len()
        );

        Self::extract_text(api_response)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        info!("Listing {} models", self.provider);
        match self.fetch_models().await {
            Ok(models) => Ok(models),
            Err(e) if !self.fallback_models.is_empty() => {
                warn!(
                    "Error listing {} models, returning known models instead: {:#}",
                    self.provider, e
                );
                Ok(self.fallback_models.clone())
            }
            Err(e) => Err(e),
        }
    }
}

// ── wire types ──

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}
