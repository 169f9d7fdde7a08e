//! Capability providers: one backend per LLM vendor
//!
//! Each backend implements [`ModelBackend`] over plain HTTP. The
//! [`ProviderRegistry`] maps every configured [`Provider`] to its backend and
//! is built once at startup.

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

#[cfg(test)]
pub(crate) mod mock;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use crate::provider::Provider;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

/// Trait that every vendor backend implements
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Send a single user prompt and return the text reply
    async fn prompt(&self, text: &str, model: &str) -> Result<String>;

    /// Model names currently offered by the backend.
    ///
    /// Backends may answer with a stale built-in list when the catalog
    /// endpoint is unreachable.
    async fn list_models(&self) -> Result<Vec<String>>;
}

/// Read-only map from provider to backend
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    backends: HashMap<Provider, Arc<dyn ModelBackend>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, replacing any previous one for the provider
    pub fn with_backend(mut self, provider: Provider, backend: Arc<dyn ModelBackend>) -> Self {
        self.backends.insert(provider, backend);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn ModelBackend>> {
        self.backends.get(&provider).cloned()
    }

    /// Registered providers, in listing order
    pub fn providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.backends.contains_key(p))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

/// HTTP client shared by the backends' constructors
pub(crate) fn http_client(timeout: Duration) -> Client {
    match Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(
                "Failed to build HTTP client with {:?} timeout, falling back to defaults: {}",
                timeout, e
            );
            Client::new()
        }
    }
}

/// Default request timeout for vendor calls
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[cfg(test)]
mod tests {
    use super::mock::MockBackend;
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = ProviderRegistry::new()
            .with_backend(Provider::OpenAi, Arc::new(MockBackend::new(&["gpt-4o"], "hi")))
            .with_backend(Provider::Ollama, Arc::new(MockBackend::new(&["llama3"], "hi")));

        assert!(registry.get(Provider::OpenAi).is_some());
        assert!(registry.get(Provider::Anthropic).is_none());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.providers(), vec![Provider::OpenAi, Provider::Ollama]);
    }

    #[test]
    fn test_registry_debug_lists_providers() {
        let registry = ProviderRegistry::new()
            .with_backend(Provider::Groq, Arc::new(MockBackend::new(&[], "")));
        let debug = format!("{:?}", registry);
        assert!(debug.contains("Groq"));
    }

    #[test]
    fn test_http_client_builds_with_default_timeout() {
        let client = http_client(DEFAULT_TIMEOUT);
        assert!(client.get("http://localhost:1/").build().is_ok());
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.providers().is_empty());
    }
}
