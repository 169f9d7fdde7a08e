//! Static table of supported providers and their aliases

use serde::{Deserialize, Serialize};

/// A supported LLM backend, addressable by a full or a short alias
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Gemini,
    Groq,
    DeepSeek,
    Ollama,
}

/// Listing entry returned by [`list_providers`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub full_name: String,
    pub short_name: String,
}

impl Provider {
    /// Every provider, in listing order
    pub const ALL: [Provider; 6] = [
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::Gemini,
        Provider::Groq,
        Provider::DeepSeek,
        Provider::Ollama,
    ];

    pub fn full_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Groq => "groq",
            Self::DeepSeek => "deepseek",
            Self::Ollama => "ollama",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "o",
            Self::Anthropic => "a",
            Self::Gemini => "g",
            Self::Groq => "q",
            Self::DeepSeek => "d",
            Self::Ollama => "l",
        }
    }

    /// Resolve a full or short alias. Matching is exact and case-sensitive;
    /// an unknown alias is `None`, not an error.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.full_name() == name || p.short_name() == name)
    }

    /// Environment variable holding this provider's API key, if it needs one
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::DeepSeek => Some("DEEPSEEK_API_KEY"),
            Self::Ollama => None,
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI",
            Self::Anthropic => "ANTHROPIC",
            Self::Gemini => "GEMINI",
            Self::Groq => "GROQ",
            Self::DeepSeek => "DEEPSEEK",
            Self::Ollama => "OLLAMA",
        }
    }

    pub fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.variant_name().to_string(),
            full_name: self.full_name().to_string(),
            short_name: self.short_name().to_string(),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.full_name())
    }
}

/// All providers with their full and short names
pub fn list_providers() -> Vec<ProviderInfo> {
    Provider::ALL.iter().map(Provider::info).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_and_short_resolve_to_same_entry() {
        for provider in Provider::ALL {
            assert_eq!(Provider::from_name(provider.full_name()), Some(provider));
            assert_eq!(Provider::from_name(provider.short_name()), Some(provider));
        }
        assert_eq!(Provider::from_name("openai"), Provider::from_name("o"));
    }

    #[test]
    fn test_unknown_alias_is_none() {
        assert_eq!(Provider::from_name("unknown"), None);
        assert_eq!(Provider::from_name(""), None);
    }

    #[test]
    fn test_matching_is_exact() {
        assert_eq!(Provider::from_name("OpenAI"), None);
        assert_eq!(Provider::from_name("open"), None);
        assert_eq!(Provider::from_name(" o"), None);
    }

    #[test]
    fn test_short_names_are_unique() {
        let mut shorts: Vec<_> = Provider::ALL.iter().map(|p| p.short_name()).collect();
        shorts.sort();
        shorts.dedup();
        assert_eq!(shorts.len(), Provider::ALL.len());
    }

    #[test]
    fn test_list_providers() {
        let providers = list_providers();
        assert_eq!(providers.len(), 6);
        assert_eq!(providers[0].name, "OPENAI");
        assert_eq!(providers[0].full_name, "openai");
        assert_eq!(providers[0].short_name, "o");
        assert_eq!(providers[5].full_name, "ollama");
        assert_eq!(providers[5].short_name, "l");
    }

    #[test]
    fn test_display_uses_full_name() {
        assert_eq!(Provider::DeepSeek.to_string(), "deepseek");
        assert_eq!(
            serde_json::to_string(&Provider::DeepSeek).unwrap(),
            "\"deepseek\""
        );
        assert_eq!(serde_json::to_string(&Provider::OpenAi).unwrap(), "\"openai\"");
    }
}
