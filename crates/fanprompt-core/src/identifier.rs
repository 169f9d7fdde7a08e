//! `provider:model` identifier parsing

use crate::error::RouterError;
use crate::provider::Provider;

/// Separator between the provider alias and the model name
pub const SEPARATOR: char = ':';

/// Split a raw identifier at the first separator only.
///
/// Model names may contain the separator themselves (`llama3:latest`), so
/// everything after the first one belongs to the model.
pub fn split_provider_and_model(raw: &str) -> Result<(&str, &str), RouterError> {
    raw.split_once(SEPARATOR)
        .ok_or_else(|| RouterError::MalformedIdentifier(raw.to_string()))
}

/// A model on a resolved provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelIdentifier {
    pub provider: Provider,
    pub model: String,
}

impl ModelIdentifier {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Split and resolve the provider alias
    pub fn parse(raw: &str) -> Result<Self, RouterError> {
        let (alias, model) = split_provider_and_model(raw)?;
        let provider = Provider::from_name(alias)
            .ok_or_else(|| RouterError::UnknownProvider(alias.to_string()))?;
        Ok(Self::new(provider, model))
    }

    /// Same provider, different model
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self::new(self.provider, model)
    }
}

impl std::fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.provider, SEPARATOR, self.model)
    }
}

impl std::str::FromStr for ModelIdentifier {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple() {
        assert_eq!(
            split_provider_and_model("openai:gpt-4o-mini").unwrap(),
            ("openai", "gpt-4o-mini")
        );
    }

    #[test]
    fn test_split_keeps_extra_separators_in_model() {
        assert_eq!(
            split_provider_and_model("ollama:llama3:latest").unwrap(),
            ("ollama", "llama3:latest")
        );
        let (provider, model) = split_provider_and_model("l:a:b:c").unwrap();
        assert!(!provider.contains(SEPARATOR));
        assert_eq!(model, "a:b:c");
        assert_eq!(format!("{}{}{}", provider, SEPARATOR, model), "l:a:b:c");
    }

    #[test]
    fn test_split_without_separator_is_malformed() {
        let err = split_provider_and_model("gpt-4o").unwrap_err();
        assert!(matches!(err, RouterError::MalformedIdentifier(ref s) if s == "gpt-4o"));
    }

    #[test]
    fn test_split_empty_parts() {
        assert_eq!(split_provider_and_model(":model").unwrap(), ("", "model"));
        assert_eq!(split_provider_and_model("o:").unwrap(), ("o", ""));
    }

    #[test]
    fn test_parse_resolves_short_alias() {
        let id = ModelIdentifier::parse("o:gpt-4o-mini").unwrap();
        assert_eq!(id.provider, Provider::OpenAi);
        assert_eq!(id.model, "gpt-4o-mini");
        assert_eq!(id.to_string(), "openai:gpt-4o-mini");
    }

    #[test]
    fn test_parse_unknown_provider() {
        let err = ModelIdentifier::parse("unknown:x").unwrap_err();
        assert!(matches!(err, RouterError::UnknownProvider(ref s) if s == "unknown"));
    }

    #[test]
    fn test_with_model() {
        let id: ModelIdentifier = "a:claude-3-5-sonnet".parse().unwrap();
        let corrected = id.with_model("claude-3-5-sonnet-20240620");
        assert_eq!(corrected.provider, Provider::Anthropic);
        assert_eq!(corrected.to_string(), "anthropic:claude-3-5-sonnet-20240620");
    }
}
