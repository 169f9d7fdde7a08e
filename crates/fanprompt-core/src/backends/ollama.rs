//! Ollama backend (native `/api` endpoints)

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{DEFAULT_TIMEOUT, ModelBackend, http_client};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug)]
pub struct OllamaBackend {
    client: Client,
    base_url: String,
}

impl OllamaBackend {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: http_client(DEFAULT_TIMEOUT),
            base_url: base_url
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(anyhow!(
            "Ollama {} failed with status {}: {}",
            what,
            status,
            error_text
        ))
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    async fn prompt(&self, text: &str, model: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model,
            messages: vec![WireMessage {
                role: "user",
                content: text,
            }],
            stream: false,
        };

        info!("Sending prompt to Ollama model: {}", model);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Ollama")?;
        let response = Self::check_status(response, "chat request").await?;

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama chat response")?;

        debug!("Ollama response: done={:?}", chat.done);
        Ok(chat.message.content)
    }

    /// Locally pulled models. There is no offline fallback: if the daemon is
    /// down the error propagates.
    async fn list_models(&self) -> Result<Vec<String>> {
        info!("Listing Ollama models");
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach Ollama")?;
        let response = Self::check_status(response, "tags request").await?;

        let tags: TagsResponse = response
            .json()
            .await
            .context("Failed to parse Ollama tags response")?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

// ── wire types ──

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
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
struct ChatResponse {
    message: ResponseMessage,
    done: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}
