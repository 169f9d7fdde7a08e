//! Google Gemini backend

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{DEFAULT_TIMEOUT, ModelBackend, http_client};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Known Gemini models, used when the catalog cannot be fetched
pub const GEMINI_FALLBACK_MODELS: &[&str] = &[
    "gemini-1.5-pro",
    "gemini-1.5-flash",
    "gemini-1.5-flash-latest",
    "gemini-1.0-pro",
    "gemini-2.0-flash",
];

const GENERATE_CONTENT: &str = "generateContent";

pub struct GeminiBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiBackend {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: http_client(DEFAULT_TIMEOUT),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn extract_text(resp: GenerateResponse) -> Result<String> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Gemini response had no candidates"))?;
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        Ok(text)
    }

    /// Models that can generate content, without the `models/` prefix
    fn content_models(resp: ModelListResponse) -> Vec<String> {
        resp.models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == GENERATE_CONTENT)
            })
            .map(|m| {
                m.name
                    .strip_prefix("models/")
                    .unwrap_or(&m.name)
                    .to_string()
            })
            .collect()
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url,
            encode_path_segment(model),
            GENERATE_CONTENT
        )
    }

    async fn fetch_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/models?pageSize=1000", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .context("Failed to reach Gemini model catalog")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Gemini models request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let list: ModelListResponse = response
            .json()
            .await
            .context("Failed to parse Gemini model catalog")?;
        Ok(Self::content_models(list))
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    async fn prompt(&self, text: &str, model: &str) -> Result<String> {
        let url = self.generate_url(model);
        let body = GenerateRequest {
            contents: vec![WireContent {
                role: "user",
                parts: vec![WirePart { text }],
            }],
        };

        info!("Sending prompt to Gemini model: {}", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Gemini API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        debug!(
            "Gemini response: candidates={}",
            api_response.candidates.len()
        );

        Self::extract_text(api_response)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        info!("Listing Gemini models");
        match self.fetch_models().await {
            Ok(models) => Ok(models),
            Err(e) => {
                warn!(
                    "Error listing Gemini models, returning known models instead: {:#}",
                    e
                );
                Ok(GEMINI_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect())
            }
        }
    }
}

// ── wire types ──

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<WireContent<'a>>,
}

#[derive(Debug, Serialize)]
struct WireContent<'a> {
    role: &'a str,
    parts: Vec<WirePart<'a>>,
}

#[derive(Debug, Serialize)]
struct WirePart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelListResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
