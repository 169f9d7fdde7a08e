//! Fan-out orchestration: one prompt, many models
//!
//! Each identifier runs in its own task (validate, correct, prompt). Tasks are
//! independent, so a failure in one only affects its own slot in the output.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::corrector::ModelCorrector;
use crate::error::RouterError;
use crate::identifier::ModelIdentifier;
use crate::router::ModelRouter;

pub const DEFAULT_CORRECTION_MODEL: &str = "o:gpt-4o-mini";
pub const DEFAULT_MODEL: &str = "anthropic:claude-3-7-sonnet-20250219";

/// Defaults used when a caller does not name models explicitly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutConfig {
    /// `provider:model` used to correct unknown model names
    pub correction_model: String,
    /// Models prompted when the caller supplies none
    pub default_models: Vec<String>,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            correction_model: DEFAULT_CORRECTION_MODEL.to_string(),
            default_models: vec![DEFAULT_MODEL.to_string()],
        }
    }
}

/// Outcome for one requested identifier
#[derive(Debug)]
pub struct DispatchResult {
    /// The identifier exactly as the caller wrote it
    pub identifier: String,
    pub response: Result<String, RouterError>,
}

impl DispatchResult {
    pub fn is_ok(&self) -> bool {
        self.response.is_ok()
    }

    /// The response text, or `Error (<identifier>): <message>`
    pub fn into_text(self) -> String {
        match self.response {
            Ok(text) => text,
            Err(e) => format!("Error ({}): {}", self.identifier, e),
        }
    }
}

/// Sends one prompt to many models concurrently
#[derive(Debug, Clone)]
pub struct FanOutOrchestrator {
    router: ModelRouter,
    corrector: ModelCorrector,
    config: FanOutConfig,
}

impl FanOutOrchestrator {
    pub fn new(router: ModelRouter, config: FanOutConfig) -> Self {
        Self {
            corrector: ModelCorrector::new(router.clone()),
            router,
            config,
        }
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    pub fn config(&self) -> &FanOutConfig {
        &self.config
    }

    /// The caller's models, or the configured defaults when none were given.
    /// An explicitly empty list is kept so that fan-out rejects it.
    pub fn models_or_default(&self, models: Option<Vec<String>>) -> Vec<String> {
        models.unwrap_or_else(|| self.config.default_models.clone())
    }

    /// Prompt every identifier and return one string per identifier, in input
    /// order. Failed identifiers yield `Error (<identifier>): <message>`.
    pub async fn fan_out(
        &self,
        text: &str,
        identifiers: &[String],
        correction_model: Option<&str>,
    ) -> Result<Vec<String>, RouterError> {
        let results = self.fan_out_results(text, identifiers, correction_model).await?;
        Ok(results.into_iter().map(DispatchResult::into_text).collect())
    }

    /// Like [`fan_out`](Self::fan_out) but keeps the typed per-identifier errors
    pub async fn fan_out_results(
        &self,
        text: &str,
        identifiers: &[String],
        correction_model: Option<&str>,
    ) -> Result<Vec<DispatchResult>, RouterError> {
        if identifiers.is_empty() {
            return Err(RouterError::NoModelsProvided);
        }

        let text: Arc<str> = Arc::from(text);
        let correction: Arc<str> =
            Arc::from(correction_model.unwrap_or(&self.config.correction_model));

        info!(
            "Fanning out prompt to {} model(s): {}",
            identifiers.len(),
            identifiers.join(", ")
        );

        let mut handles = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            let router = self.router.clone();
            let corrector = self.corrector.clone();
            let identifier = identifier.clone();
            let text = text.clone();
            let correction = correction.clone();
            handles.push(tokio::spawn(async move {
                Self::dispatch_one(&router, &corrector, &identifier, &text, &correction).await
            }));
        }

        // One slot per input position; awaiting in input order keeps the
        // output aligned with `identifiers` whatever order tasks finish in.
        let mut results = Vec::with_capacity(handles.len());
        for (handle, identifier) in handles.into_iter().zip(identifiers) {
            let response = match handle.await {
                Ok(response) => response,
                Err(e) => Err(RouterError::TaskFailed(e.to_string())),
            };
            if let Err(e) = &response {
                error!("Error processing prompt for {}: {}", identifier, e);
            }
            results.push(DispatchResult {
                identifier: identifier.clone(),
                response,
            });
        }

        Ok(results)
    }

    async fn dispatch_one(
        router: &ModelRouter,
        corrector: &ModelCorrector,
        identifier: &str,
        text: &str,
        correction_model: &str,
    ) -> Result<String, RouterError> {
        let id = ModelIdentifier::parse(identifier)?;
        router.backend(id.provider)?;

        let outcome = corrector
            .correct(id.provider, &id.model, correction_model)
            .await;
        let id = if outcome.was_corrected {
            id.with_model(outcome.corrected_model)
        } else {
            id
        };

        debug!("Dispatching {} as {}", identifier, id);
        router.prompt(&id, text).await
    }
}
