/// LLM Client — the single point of entry for all text-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call a provider API directly.
/// Pipeline stages reach providers only through `LlmClient::call`, which picks
/// the adapter named by the per-request `ModelConfig`.
///
/// The backend registry is built once at startup and never mutated, so one
/// client is shared by every concurrent request without locking.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod prompts;

/// Sampling temperature for the default creativity level.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("{0} requires an API key")]
    MissingApiKey(ProviderKind),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Provider identity
// ────────────────────────────────────────────────────────────────────────────

/// Identifies a completion backend. Parsed case-insensitively from requests and env.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    Groq,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
        ProviderKind::Groq,
        ProviderKind::Ollama,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Groq => "groq",
            ProviderKind::Ollama => "ollama",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Gemini => "Google Gemini",
            ProviderKind::Groq => "Groq",
            ProviderKind::Ollama => "Ollama",
        }
    }

    /// Every hosted provider needs a credential; the local Ollama daemon does not.
    pub fn requires_api_key(self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }

    /// Environment variable consulted when a request carries no credential.
    pub fn api_key_env(self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Gemini => Some("GEMINI_API_KEY"),
            ProviderKind::Groq => Some("GROQ_API_KEY"),
            ProviderKind::Ollama => None,
        }
    }

    /// Suggested models, first entry is the provider default.
    pub fn suggested_models(self) -> &'static [&'static str] {
        match self {
            ProviderKind::OpenAi => &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"],
            ProviderKind::Anthropic => &[
                "claude-sonnet-4-20250514",
                "claude-3-5-haiku-20241022",
                "claude-3-opus-20240229",
            ],
            ProviderKind::Gemini => &["gemini-2.0-flash-exp", "gemini-1.5-pro", "gemini-1.5-flash"],
            ProviderKind::Groq => &[
                "llama-3.3-70b-versatile",
                "llama-3.1-8b-instant",
                "mixtral-8x7b-32768",
            ],
            ProviderKind::Ollama => &["llama3.3", "llama3.2", "mistral", "codellama", "phi3"],
        }
    }

    pub fn default_model(self) -> &'static str {
        self.suggested_models()[0]
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "gemini" | "google" | "google gemini" => Ok(ProviderKind::Gemini),
            "groq" => Ok(ProviderKind::Groq),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(LlmError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl TryFrom<String> for ProviderKind {
    type Error = LlmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProviderKind> for String {
    fn from(kind: ProviderKind) -> Self {
        kind.as_str().to_string()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-request model configuration
// ────────────────────────────────────────────────────────────────────────────

/// Fully resolved model selection for one pipeline stage of one request.
#[derive(Clone, PartialEq)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
}

// Credentials must never reach the logs.
impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// What an adapter receives for one completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub model: &'a str,
    pub api_key: Option<&'a str>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// One concrete provider adapter. Implementations must hold no per-request state.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn generate(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError>;
}

/// Startup settings for the HTTP adapters.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub http_timeout: Duration,
    pub max_tokens: u32,
    pub ollama_endpoint: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single LLM client used by the generation pipeline.
#[derive(Clone)]
pub struct LlmClient {
    backends: Arc<HashMap<ProviderKind, Arc<dyn CompletionBackend>>>,
    max_tokens: u32,
}

impl LlmClient {
    /// Builds the client with one HTTP adapter per supported provider.
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(settings.http_timeout).build()?;

        let backends: Vec<Arc<dyn CompletionBackend>> = vec![
            Arc::new(openai::OpenAiBackend::openai(http.clone())),
            Arc::new(openai::OpenAiBackend::groq(http.clone())),
            Arc::new(anthropic::AnthropicBackend::new(http.clone())),
            Arc::new(gemini::GeminiBackend::new(http.clone())),
            Arc::new(ollama::OllamaBackend::new(
                http,
                settings.ollama_endpoint.clone(),
            )),
        ];

        Ok(Self::with_backends(backends, settings.max_tokens))
    }

    pub fn with_backends(backends: Vec<Arc<dyn CompletionBackend>>, max_tokens: u32) -> Self {
        let backends = backends
            .into_iter()
            .map(|backend| (backend.kind(), backend))
            .collect();
        Self {
            backends: Arc::new(backends),
            max_tokens,
        }
    }

    /// Makes one completion call with the backend selected by `config`.
    ///
    /// No transport-level retries: a failed call surfaces immediately and the
    /// pipeline decides what to do with it. Blank completions are an error.
    pub async fn call(
        &self,
        prompt: &str,
        system: &str,
        config: &ModelConfig,
    ) -> Result<String, LlmError> {
        let backend = self
            .backends
            .get(&config.provider)
            .ok_or_else(|| LlmError::UnsupportedProvider(config.provider.as_str().to_string()))?;

        let api_key = config.api_key.as_deref().filter(|k| !k.trim().is_empty());
        if config.provider.requires_api_key() && api_key.is_none() {
            return Err(LlmError::MissingApiKey(config.provider));
        }

        let request = CompletionRequest {
            system,
            prompt,
            model: &config.model,
            api_key,
            temperature: config.temperature,
            max_tokens: self.max_tokens,
        };

        let text = backend.generate(&request).await?;
        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }

        debug!(
            "{} call succeeded: model={}, output_chars={}",
            config.provider,
            config.model,
            text.len()
        );

        Ok(text)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared HTTP plumbing for adapters
// ────────────────────────────────────────────────────────────────────────────

/// Sends a JSON body and decodes a JSON response, mapping non-2xx statuses to
/// `LlmError::Api` with the provider's own error message when one is present.
pub(crate) async fn send_json<B, T>(
    provider: ProviderKind,
    request: RequestBuilder,
    body: &B,
) -> Result<T, LlmError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = request
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("{provider} API returned {status}");
        return Err(LlmError::Api {
            status: status.as_u16(),
            message: extract_error_message(&body),
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(LlmError::Parse)
}

/// Pulls a readable message out of the common provider error envelopes:
/// `{"error": {"message": ...}}` (OpenAI, Anthropic, Gemini, Groq) and
/// `{"error": "..."}` (Ollama). Falls back to the raw body.
fn extract_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorField {
        Detailed { message: String },
        Plain(String),
    }

    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorField,
    }

    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorField::Detailed { message },
        }) => message,
        Ok(ErrorEnvelope {
            error: ErrorField::Plain(message),
        }) => message,
        Err(_) => body.to_string(),
    }
}

/// Strips an enclosing ```lang ... ``` or ``` ... ``` code fence from LLM output.
/// Fences that do not enclose the whole text are left in place.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    // Drop the opening fence line only when it is a bare language tag
    // (`latex`, `tex`, ...); content written on the fence line is kept.
    let rest = match rest.split_once('\n') {
        Some((tag, body)) if is_info_string(tag.trim()) => body,
        _ => rest,
    };

    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

fn is_info_string(line: &str) -> bool {
    line.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-'))
}
