//! Ollama adapter for locally served models. No credential; the endpoint comes
//! from startup config.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{send_json, CompletionBackend, CompletionRequest, LlmError, ProviderKind};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

pub struct OllamaBackend {
    client: Client,
    endpoint: String,
}

impl OllamaBackend {
    pub fn new(client: Client, endpoint: String) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint)
    }
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    async fn generate(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let body = GenerateRequest {
            model: request.model,
            prompt: request.prompt,
            system: request.system,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response: GenerateResponse = send_json(
            ProviderKind::Ollama,
            self.client.post(self.generate_url()),
            &body,
        )
        .await?;

        Ok(response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_url_tolerates_trailing_slash() {
        let backend = OllamaBackend::new(Client::new(), "http://localhost:11434/".to_string());
        assert_eq!(backend.generate_url(), "http://localhost:11434/api/generate");
    }

    #[test]
    fn test_request_disables_streaming() {
        let body = GenerateRequest {
            model: "llama3.2",
            prompt: "p",
            system: "s",
            stream: false,
            options: GenerateOptions {
                temperature: 0.3,
                num_predict: 64,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 64);
    }
}
