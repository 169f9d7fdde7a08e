//! Anthropic Claude backend

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{DEFAULT_TIMEOUT, ModelBackend, http_client};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Known Claude models, used when the catalog cannot be fetched
pub const ANTHROPIC_FALLBACK_MODELS: &[&str] = &[
    "claude-3-7-sonnet",
    "claude-3-5-sonnet",
    "claude-3-5-sonnet-20240620",
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
    "claude-3-5-haiku",
];

pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AnthropicBackend {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: http_client(DEFAULT_TIMEOUT),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Concatenate the text blocks of a message response
    fn extract_text(resp: MessagesResponse) -> Result<String> {
        let text: Vec<String> = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .collect();
        if text.is_empty() {
            return Err(anyhow!("Anthropic response had no text content"));
        }
        Ok(text.join(""))
    }

    async fn fetch_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1/models?limit=1000", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await
            .context("Failed to reach Anthropic model catalog")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Anthropic models request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let list: ModelListResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic model catalog")?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}

#[async_trait]
impl ModelBackend for AnthropicBackend {
    async fn prompt(&self, text: &str, model: &str) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model,
            max_tokens: self.max_tokens,
            messages: vec![WireMessage {
                role: "user",
                content: text,
            }],
        };

        info!("Sending prompt to Anthropic model: {}", model);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Anthropic API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic API response")?;

        debug!("Anthropic response: blocks={}", api_response.content.len());

        Self::extract_text(api_response)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        info!("Listing Anthropic models");
        match self.fetch_models().await {
            Ok(models) => Ok(models),
            Err(e) => {
                warn!(
                    "Error listing Anthropic models, returning known models instead: {:#}",
                    e
                );
                Ok(ANTHROPIC_FALLBACK_MODELS
                    .iter()
                    .map(|m| m.to_string())
                    .collect())
            }
        }
    }
}

// ── wire types ──

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_skips_non_text_blocks() {
        let resp: MessagesResponse = serde_json::from_value(serde_json::json!({
            "id": "msg_1",
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "x"},
                {"type": "text", "text": "Paris is the capital of France."}
            ],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert_eq!(
            AnthropicBackend::extract_text(resp).unwrap(),
            "Paris is the capital of France."
        );
    }

    #[test]
    fn test_extract_text_empty() {
        let resp: MessagesResponse =
            serde_json::from_value(serde_json::json!({"content": []})).unwrap();
        assert!(AnthropicBackend::extract_text(resp).is_err());
    }

    #[test]
    fn test_request_shape() {
        let body = MessagesRequest {
            model: "claude-3-5-haiku",
            max_tokens: 4096,
            messages: vec![WireMessage {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["max_tokens"], 4096);
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_debug_hides_key() {
        let backend = AnthropicBackend::new("sk-ant-secret".to_string(), None);
        let debug = format!("{:?}", backend);
        assert!(!debug.contains("sk-ant-secret"));
        assert!(debug.contains(ANTHROPIC_BASE_URL));
    }

    #[tokio::test]
    async fn test_unreachable_catalog_uses_fallback() {
        let backend =
            AnthropicBackend::new(String::new(), Some("http://127.0.0.1:9".to_string()));
        let models = backend.list_models().await.unwrap();
        assert_eq!(models.len(), ANTHROPIC_FALLBACK_MODELS.len());
        assert!(models.contains(&"claude-3-opus-20240229".to_string()));
    }
}
