//! Routes `provider:model` requests to the registered backend

use std::sync::Arc;

use tracing::{debug, error};

use crate::backends::{ModelBackend, ProviderRegistry};
use crate::error::RouterError;
use crate::identifier::ModelIdentifier;
use crate::provider::Provider;

/// Dispatches single prompt and catalog requests.
///
/// The router never corrects model names and never retries; both are left to
/// the caller and to the backends respectively.
#[derive(Debug, Clone)]
pub struct ModelRouter {
    registry: Arc<ProviderRegistry>,
}

impl ModelRouter {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Backend registered for `provider`
    pub fn backend(&self, provider: Provider) -> Result<Arc<dyn ModelBackend>, RouterError> {
        self.registry
            .get(provider)
            .ok_or(RouterError::ProviderUnavailable(provider))
    }

    /// Resolve a provider alias (full or short)
    pub fn resolve_provider(&self, alias: &str) -> Result<Provider, RouterError> {
        Provider::from_name(alias).ok_or_else(|| RouterError::UnknownProvider(alias.to_string()))
    }

    /// Parse `identifier` and send `text` to its provider as-is
    pub async fn route_prompt(&self, identifier: &str, text: &str) -> Result<String, RouterError> {
        let id = ModelIdentifier::parse(identifier)?;
        self.prompt(&id, text).await
    }

    /// Send `text` to an already resolved identifier
    pub async fn prompt(&self, id: &ModelIdentifier, text: &str) -> Result<String, RouterError> {
        let backend = self.backend(id.provider)?;
        debug!("Routing prompt to {}", id);
        backend.prompt(text, &id.model).await.map_err(|source| {
            error!("Error routing prompt to {}: {:#}", id.provider, source);
            RouterError::PromptFailed {
                provider: id.provider,
                model: id.model.clone(),
                source,
            }
        })
    }

    /// List the models of the provider named by `alias`
    pub async fn route_list_models(&self, alias: &str) -> Result<Vec<String>, RouterError> {
        let provider = self.resolve_provider(alias)?;
        self.list_models(provider).await
    }

    pub async fn list_models(&self, provider: Provider) -> Result<Vec<String>, RouterError> {
        let backend = self.backend(provider)?;
        backend.list_models().await.map_err(|source| {
            error!("Error listing models for {}: {:#}", provider, source);
            RouterError::ListModelsFailed { provider, source }
        })
    }
}
