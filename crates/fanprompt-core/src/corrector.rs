//! Model-name correction against a provider's live catalog
//!
//! When a requested model is not in the catalog, a second "weak" model is
//! asked to pick the closest real name. Correction is advisory: any failure
//! falls back to the name the caller asked for, and the backend itself gets
//! to reject it.

use anyhow::Result;
use tracing::{info, warn};

use crate::identifier::{ModelIdentifier, split_provider_and_model};
use crate::provider::Provider;
use crate::router::ModelRouter;

/// Model names that carry suffix syntax of their own and skip validation
pub const CORRECTION_EXEMPT_MODELS: &[&str] =
    &["claude-3-7-sonnet-20250219", "gemini-2.5-flash-preview-04-17"];

/// Result of validating one model name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionOutcome {
    pub original_model: String,
    pub corrected_model: String,
    pub was_corrected: bool,
}

impl CorrectionOutcome {
    fn unchanged(model: &str) -> Self {
        Self {
            original_model: model.to_string(),
            corrected_model: model.to_string(),
            was_corrected: false,
        }
    }

    fn corrected(original: &str, corrected: String) -> Self {
        Self {
            original_model: original.to_string(),
            was_corrected: corrected != original,
            corrected_model: corrected,
        }
    }

    /// The model name to dispatch with
    pub fn model(&self) -> &str {
        &self.corrected_model
    }
}

/// Validates model names and asks a correction model to fix unknown ones
#[derive(Debug, Clone)]
pub struct ModelCorrector {
    router: ModelRouter,
}

impl ModelCorrector {
    pub fn new(router: ModelRouter) -> Self {
        Self { router }
    }

    /// Validate `model` for `provider`, correcting it with the model named by
    /// `correction_model` (`provider:model`) when it is not in the catalog.
    ///
    /// Never fails: every error degrades to the original model name.
    pub async fn correct(
        &self,
        provider: Provider,
        model: &str,
        correction_model: &str,
    ) -> CorrectionOutcome {
        if is_exempt(model) {
            return CorrectionOutcome::unchanged(model);
        }

        match self.try_correct(provider, model, correction_model).await {
            Ok(outcome) => {
                if outcome.was_corrected {
                    info!(
                        "Corrected model name from '{}' to '{}' for provider '{}' (via {})",
                        model, outcome.corrected_model, provider, correction_model
                    );
                }
                outcome
            }
            Err(e) => {
                warn!(
                    "Error validating model '{}' for provider '{}': {:#}",
                    model, provider, e
                );
                CorrectionOutcome::unchanged(model)
            }
        }
    }

    async fn try_correct(
        &self,
        provider: Provider,
        model: &str,
        correction_model: &str,
    ) -> Result<CorrectionOutcome> {
        let available = self.router.list_models(provider).await?;

        if available.iter().any(|m| m == model) {
            info!("Using {} and {}", provider, model);
            return Ok(CorrectionOutcome::unchanged(model));
        }

        let (alias, correction_name) = split_provider_and_model(correction_model)?;
        let Some(correction_provider) = Provider::from_name(alias) else {
            warn!(
                "Invalid correction model provider: {}, skipping correction",
                alias
            );
            return Ok(CorrectionOutcome::unchanged(model));
        };

        let instruction = correction_prompt(model, provider, &available);
        let answer = self
            .router
            .prompt(
                &ModelIdentifier::new(correction_provider, correction_name),
                &instruction,
            )
            .await?;
        let answer = answer.trim();

        if available.iter().any(|m| m == answer) {
            Ok(CorrectionOutcome::corrected(model, answer.to_string()))
        } else {
            warn!(
                "Corrected model {} not found in available models for {}",
                answer, provider
            );
            Ok(CorrectionOutcome::unchanged(model))
        }
    }
}

fn is_exempt(model: &str) -> bool {
    CORRECTION_EXEMPT_MODELS
        .iter()
        .any(|exempt| model.contains(exempt))
}

/// Instruction sent to the correction model
pub fn correction_prompt(model: &str, provider: Provider, available: &[String]) -> String {
    format!(
        "Given a user-provided model name \"{}\" for the provider \"{}\", and the list of actual available models below,\n\
         return the closest matching model name from the available models list.\n\
         Only return the exact model name, nothing else.\n\n\
         Available models: {}\n",
        model,
        provider,
        available.join(", ")
    )
}
