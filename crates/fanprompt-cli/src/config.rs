use anyhow::{Context, Result};
use fanprompt_core::Provider;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanpromptConfig {
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Used when a request names no models
    #[serde(default = "default_models")]
    pub default_models: Vec<String>,
    /// Model asked to fix misspelled model names
    #[serde(default = "default_correction_model")]
    pub correction_model: String,
}

fn default_models() -> Vec<String> {
    vec![fanprompt_core::fanout::DEFAULT_MODEL.to_string()]
}

fn default_correction_model() -> String {
    fanprompt_core::fanout::DEFAULT_CORRECTION_MODEL.to_string()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            default_models: default_models(),
            correction_model: default_correction_model(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ApiProviderConfig,
    #[serde(default)]
    pub anthropic: AnthropicProviderConfig,
    #[serde(default)]
    pub gemini: ApiProviderConfig,
    #[serde(default)]
    pub groq: ApiProviderConfig,
    #[serde(default)]
    pub deepseek: ApiProviderConfig,
    #[serde(default)]
    pub ollama: OllamaProviderConfig,
}

impl ProvidersConfig {
    /// API key configured for `provider`; `None` for Ollama
    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::OpenAi => Some(&self.openai.api_key),
            Provider::Anthropic => Some(&self.anthropic.api_key),
            Provider::Gemini => Some(&self.gemini.api_key),
            Provider::Groq => Some(&self.groq.api_key),
            Provider::DeepSeek => Some(&self.deepseek.api_key),
            Provider::Ollama => None,
        }
    }

    /// Whether `provider` has what it needs to be registered. Ollama needs no
    /// credentials and is always considered available.
    pub fn is_available(&self, provider: Provider) -> bool {
        match self.api_key(provider) {
            Some(key) => !key.trim().is_empty(),
            None => true,
        }
    }

    /// Providers whose key is a literal value rather than a `${VAR}` reference
    pub fn hardcoded_keys(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| {
                self.api_key(*p)
                    .is_some_and(|key| !key.is_empty() && !key.contains("${"))
            })
            .collect()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ApiProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl std::fmt::Debug for ApiProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AnthropicProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_anthropic_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for AnthropicProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_anthropic_max_tokens() -> u32 {
    4096
}

impl Default for AnthropicProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            max_tokens: default_anthropic_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaProviderConfig {
    /// Defaults to http://localhost:11434
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Empty disables bearer-token auth
    #[serde(default)]
    pub auth_token: String,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("auth_token", &mask_secret(&self.auth_token))
            .finish()
    }
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
            auth_token: String::new(),
        }
    }
}

/// Mask a secret string for safe display in Debug output / logs.
/// Shows first 3 and last 4 chars for keys longer than 7 chars, otherwise "***".
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fanprompt")
}

impl FanpromptConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        // Refuse to start if group or other can read the file
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(&path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    return Err(anyhow::anyhow!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain secrets. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    ));
                }
            }
        }

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `fanprompt init` first.",
                path.display()
            )
        })?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        // Keys should come from the environment, not sit on disk
        if let Ok(raw) = toml::from_str::<Self>(&content) {
            for provider in raw.providers.hardcoded_keys() {
                warn!(
                    "{} API key is hardcoded in config file. For security, use environment variables: api_key = \"${{{}}}\"",
                    provider,
                    provider.api_key_env().unwrap_or_default()
                );
            }
        }

        Ok(config)
    }

    /// Expand allow-listed `${VAR}` references, then parse
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }

    /// Copy with every secret masked, for `fanprompt config`
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        let p = &mut cfg.providers;
        for key in [
            &mut p.openai.api_key,
            &mut p.anthropic.api_key,
            &mut p.gemini.api_key,
            &mut p.groq.api_key,
            &mut p.deepseek.api_key,
            &mut cfg.gateway.auth_token,
        ] {
            *key = mask_secret(key);
        }
        cfg
    }
}

/// Allowlist of environment variable names that may be expanded in config files.
/// This prevents an attacker who can modify the config from reading arbitrary env vars.
const ALLOWED_ENV_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GEMINI_API_KEY",
    "GROQ_API_KEY",
    "DEEPSEEK_API_KEY",
    "OLLAMA_HOST",
    "FANPROMPT_GATEWAY_TOKEN",
    "HOME",
    "USER",
];

fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            pos = abs_start + end + 1;
            continue;
        }

        let value = std::env::var(&var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let cfg = FanpromptConfig::parse(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(cfg.prompt.correction_model, "o:gpt-4o-mini");
        assert!(!cfg.prompt.default_models.is_empty());
        assert_eq!(cfg.gateway.port, 8000);
        assert_eq!(cfg.providers.anthropic.max_tokens, 4096);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = FanpromptConfig::parse("").unwrap();
        assert_eq!(
            cfg.prompt.default_models,
            vec!["anthropic:claude-3-7-sonnet-20250219"]
        );
        assert_eq!(cfg.gateway.bind, "127.0.0.1");
        assert!(cfg.gateway.auth_token.is_empty());
    }

    #[test]
    fn test_parse_sections() {
        let cfg = FanpromptConfig::parse(
            r#"
            [prompt]
            default_models = ["o:gpt-4o", "a:claude-3-5-haiku"]
            correction_model = "a:claude-3-5-haiku"

            [providers.groq]
            api_key = "gsk_test"
            base_url = "http://localhost:9999"

            [providers.ollama]
            base_url = "http://gpu-box:11434"

            [gateway]
            port = 9100
            auth_token = "s3cret-token"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.prompt.default_models.len(), 2);
        assert_eq!(cfg.prompt.correction_model, "a:claude-3-5-haiku");
        assert_eq!(cfg.providers.groq.base_url.as_deref(), Some("http://localhost:9999"));
        assert_eq!(
            cfg.providers.ollama.base_url.as_deref(),
            Some("http://gpu-box:11434")
        );
        assert_eq!(cfg.gateway.port, 9100);
    }

    #[test]
    fn test_availability() {
        let mut providers = ProvidersConfig::default();
        assert!(!providers.is_available(Provider::OpenAi));
        assert!(providers.is_available(Provider::Ollama));

        providers.openai.api_key = "sk-test".to_string();
        assert!(providers.is_available(Provider::OpenAi));

        providers.gemini.api_key = "   ".to_string();
        assert!(!providers.is_available(Provider::Gemini));
    }

    #[test]
    fn test_hardcoded_keys() {
        let raw: FanpromptConfig = toml::from_str(
            r#"
            [providers.openai]
            api_key = "${OPENAI_API_KEY}"

            [providers.groq]
            api_key = "gsk_literal"
            "#,
        )
        .unwrap();
        assert_eq!(raw.providers.hardcoded_keys(), vec![Provider::Groq]);
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("sk-ant-abcdef123456"), "sk-...3456");
        // Multi-byte characters must not panic
        assert_eq!(mask_secret("ключ-секрет-длинный"), "клю...нный");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let cfg = ApiProviderConfig {
            api_key: "sk-proj-abcdefghijkl".to_string(),
            base_url: None,
        };
        let debug = format!("{:?}", cfg);
        assert!(!debug.contains("abcdefghijkl"));
        assert!(debug.contains("sk-...ijkl"));
    }

    #[test]
    fn test_redacted() {
        let mut cfg = FanpromptConfig::default();
        cfg.providers.anthropic.api_key = "sk-ant-abcdef123456".to_string();
        cfg.gateway.auth_token = "tok".to_string();

        let redacted = cfg.redacted();
        assert_eq!(redacted.providers.anthropic.api_key, "sk-...3456");
        assert_eq!(redacted.gateway.auth_token, "***");
        assert_eq!(redacted.providers.openai.api_key, "(empty)");
        assert_eq!(cfg.gateway.auth_token, "tok");
    }

    #[test]
    fn test_expand_env_vars_allowlist() {
        // HOME is on the allowlist and set in any test environment
        let home = std::env::var("HOME").unwrap_or_default();
        assert_eq!(expand_env_vars("dir = \"${HOME}/x\""), format!("dir = \"{}/x\"", home));

        let untouched = "key = \"${SOME_RANDOM_SECRET}\"";
        assert_eq!(expand_env_vars(untouched), untouched);
    }

    #[test]
    fn test_expand_env_vars_unterminated() {
        assert_eq!(expand_env_vars("key = \"${HOME"), "key = \"${HOME");
    }

    #[cfg(unix)]
    #[test]
    fn test_load_rejects_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = FanpromptConfig::load(&Some(path.clone())).unwrap_err();
        assert!(err.to_string().contains("overly permissive"));

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        assert!(FanpromptConfig::load(&Some(path)).is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FanpromptConfig::load(&Some(dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("fanprompt init"));
    }
}
