//! fanprompt-core - send one prompt to many LLM backends
//!
//! This crate provides:
//! - A static provider table resolving full and short aliases (`openai`/`o`, ...)
//! - `provider:model` identifier parsing
//! - HTTP backends for OpenAI, Anthropic, Gemini, Groq, DeepSeek and Ollama
//! - A router for single prompt and model-listing requests
//! - Model-name correction against each provider's live catalog
//! - Concurrent fan-out with per-model failure isolation
//! - File-based prompting and the CEO-and-board decision flow

pub mod backends;
pub mod board;
pub mod corrector;
pub mod error;
pub mod fanout;
pub mod files;
pub mod identifier;
pub mod provider;
pub mod router;

pub use backends::{ModelBackend, ProviderRegistry};
pub use board::{BoardRequest, ceo_and_board};
pub use corrector::{CorrectionOutcome, ModelCorrector};
pub use error::RouterError;
pub use fanout::{DispatchResult, FanOutConfig, FanOutOrchestrator};
pub use files::{prompt_from_file, prompt_from_file_to_file};
pub use identifier::{ModelIdentifier, split_provider_and_model};
pub use provider::{Provider, ProviderInfo, list_providers};
pub use router::ModelRouter;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        assert_eq!(list_providers().len(), 6);
        let id: ModelIdentifier = "o:gpt-4o".parse().unwrap();
        assert_eq!(id.provider, Provider::OpenAi);
        assert_eq!(id.model, "gpt-4o");
        assert!(ProviderRegistry::new().is_empty());
    }
}
