//! Error taxonomy for identifier parsing, routing and fan-out

use thiserror::Error;

use crate::provider::Provider;

/// Errors raised by the router and the fan-out orchestrator.
///
/// Correction failures never show up here: the corrector degrades to the
/// uncorrected model name and only logs.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Invalid model string format: {0}. Expected format: 'provider:model'")]
    MalformedIdentifier(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("No models provided")]
    NoModelsProvided,

    #[error("Provider not available: {0}")]
    ProviderUnavailable(Provider),

    #[error("Failed to get response from {provider} ({model}): {source:#}")]
    PromptFailed {
        provider: Provider,
        model: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to list models for {provider}: {source:#}")]
    ListModelsFailed {
        provider: Provider,
        #[source]
        source: anyhow::Error,
    },

    #[error("Task failed: {0}")]
    TaskFailed(String),
}

impl RouterError {
    /// Whether the error comes from bad caller input rather than a backend
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedIdentifier(_) | Self::UnknownProvider(_) | Self::NoModelsProvided
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            RouterError::UnknownProvider("nope".to_string()).to_string(),
            "Unknown provider: nope"
        );
        assert_eq!(RouterError::NoModelsProvided.to_string(), "No models provided");
        assert!(
            RouterError::MalformedIdentifier("gpt-4o".to_string())
                .to_string()
                .contains("'provider:model'")
        );
    }

    #[test]
    fn test_prompt_failed_includes_cause() {
        let err = RouterError::PromptFailed {
            provider: Provider::OpenAi,
            model: "gpt-4o".to_string(),
            source: anyhow!("status 401: unauthorized"),
        };
        let msg = err.to_string();
        assert!(msg.contains("openai"));
        assert!(msg.contains("gpt-4o"));
        assert!(msg.contains("401"));
    }

    #[test]
    fn test_is_client_error() {
        assert!(RouterError::NoModelsProvided.is_client_error());
        assert!(RouterError::UnknownProvider("x".to_string()).is_client_error());
        assert!(!RouterError::ProviderUnavailable(Provider::Groq).is_client_error());
    }
}
