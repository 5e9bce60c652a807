//! Google Gemini `generateContent` adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{send_json, CompletionBackend, CompletionRequest, LlmError, ProviderKind};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

pub struct GeminiBackend {
    client: Client,
}

impl GeminiBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn build_body<'a>(request: &CompletionRequest<'a>) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        system_instruction: (!request.system.is_empty()).then(|| Content {
            role: None,
            parts: vec![Part {
                text: request.system,
            }],
        }),
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part {
                text: request.prompt,
            }],
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        },
    }
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let api_key = request
            .api_key
            .ok_or(LlmError::MissingApiKey(ProviderKind::Gemini))?;
        let url = format!("{GEMINI_API_BASE}/{}:generateContent", request.model);
        let body = build_body(request);

        let response: GenerateContentResponse = send_json(
            ProviderKind::Gemini,
            self.client.post(url).header("x-goog-api-key", api_key),
            &body,
        )
        .await?;

        Ok(response.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_uses_camel_case_and_system_instruction() {
        let request = CompletionRequest {
            system: "Analyze the job.",
            prompt: "JD text",
            model: "gemini-1.5-flash",
            api_key: Some("g"),
            temperature: 0.8,
            max_tokens: 2048,
        };
        let json = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Analyze the job.");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_response_text_from_first_candidate() {
        let json = r#"{
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "KEYWORDS: "}, {"text": "Kafka"}]}}
            ]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), "KEYWORDS: Kafka");
    }

    #[test]
    fn test_blocked_response_yields_empty_text() {
        let json = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert!(response.text().is_empty());
    }
}
