use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{LlmSettings, ProviderKind};

const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Application configuration loaded from environment variables.
/// Read once at startup; request handling only ever sees this immutable copy.
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub default_provider: ProviderKind,
    pub default_model: String,
    /// Credential fallbacks keyed by provider, from `<PROVIDER>_API_KEY`.
    pub provider_api_keys: HashMap<ProviderKind, String>,
    pub ollama_endpoint: String,
    pub llm_http_timeout: Duration,
    pub llm_max_tokens: u32,
    pub pipeline_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field(
                "provider_api_keys",
                &self.provider_api_keys.keys().collect::<Vec<_>>(),
            )
            .field("ollama_endpoint", &self.ollama_endpoint)
            .field("llm_http_timeout", &self.llm_http_timeout)
            .field("llm_max_tokens", &self.llm_max_tokens)
            .field("pipeline_timeout", &self.pipeline_timeout)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_provider = match var("DEFAULT_PROVIDER") {
            Some(raw) => raw
                .parse::<ProviderKind>()
                .with_context(|| format!("DEFAULT_PROVIDER '{raw}' is not a known provider"))?,
            None => ProviderKind::OpenAi,
        };

        let default_model =
            var("DEFAULT_MODEL").unwrap_or_else(|| default_provider.default_model().to_string());

        let provider_api_keys = ProviderKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let key = var(kind.api_key_env()?)?;
                Some((kind, key))
            })
            .collect();

        Ok(Config {
            port: parse_or(&var, "PORT", 8080u16)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            default_provider,
            default_model,
            provider_api_keys,
            ollama_endpoint: var("OLLAMA_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string()),
            llm_http_timeout: Duration::from_secs(parse_or(&var, "LLM_HTTP_TIMEOUT_SECS", 120u64)?),
            llm_max_tokens: parse_or(&var, "LLM_MAX_TOKENS", 8192u32)?,
            pipeline_timeout: Duration::from_secs(parse_or(
                &var,
                "PIPELINE_TIMEOUT_SECS",
                300u64,
            )?),
        })
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            http_timeout: self.llm_http_timeout,
            max_tokens: self.llm_max_tokens,
            ollama_endpoint: self.ollama_endpoint.clone(),
        }
    }

    pub fn api_key_for(&self, provider: ProviderKind) -> Option<&str> {
        self.provider_api_keys.get(&provider).map(String::as_str)
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_env_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.default_provider, ProviderKind::OpenAi);
        assert_eq!(config.default_model, "gpt-4o");
        assert_eq!(config.ollama_endpoint, DEFAULT_OLLAMA_ENDPOINT);
        assert_eq!(config.pipeline_timeout, Duration::from_secs(300));
        assert_eq!(config.llm_max_tokens, 8192);
        assert!(config.provider_api_keys.is_empty());
    }

    #[test]
    fn test_default_model_follows_default_provider() {
        let config = config_from(&[("DEFAULT_PROVIDER", "groq")]).unwrap();
        assert_eq!(config.default_provider, ProviderKind::Groq);
        assert_eq!(config.default_model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_provider_keys_are_collected() {
        let config = config_from(&[
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("GROQ_API_KEY", "   "),
        ])
        .unwrap();
        assert_eq!(config.api_key_for(ProviderKind::Anthropic), Some("sk-ant"));
        assert_eq!(config.api_key_for(ProviderKind::Groq), None);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
    }

    #[test]
    fn test_unknown_default_provider_is_rejected() {
        assert!(config_from(&[("DEFAULT_PROVIDER", "watsonx")]).is_err());
    }

    #[test]
    fn test_debug_hides_credentials() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-live-123")]).unwrap();
        assert!(!format!("{config:?}").contains("sk-live-123"));
    }
}
