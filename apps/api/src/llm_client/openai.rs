//! OpenAI Chat Completions adapter. Groq exposes the same wire format, so one
//! adapter serves both and only the base URL and provider identity differ.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{send_json, CompletionBackend, CompletionRequest, LlmError, ProviderKind};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Option<String> {
        self.choices.into_iter().next()?.message.content
    }
}

pub struct OpenAiBackend {
    client: Client,
    kind: ProviderKind,
    url: &'static str,
}

impl OpenAiBackend {
    pub fn openai(client: Client) -> Self {
        Self {
            client,
            kind: ProviderKind::OpenAi,
            url: OPENAI_API_URL,
        }
    }

    pub fn groq(client: Client) -> Self {
        Self {
            client,
            kind: ProviderKind::Groq,
            url: GROQ_API_URL,
        }
    }
}

fn build_body<'a>(request: &CompletionRequest<'a>) -> ChatRequest<'a> {
    let mut messages = Vec::with_capacity(2);
    if !request.system.is_empty() {
        messages.push(ChatMessage {
            role: "system",
            content: request.system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: request.prompt,
    });

    ChatRequest {
        model: request.model,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        messages,
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn generate(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let api_key = request.api_key.ok_or(LlmError::MissingApiKey(self.kind))?;
        let body = build_body(request);

        let response: ChatResponse =
            send_json(self.kind, self.client.post(self.url).bearer_auth(api_key), &body).await?;

        response.into_text().ok_or(LlmError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_puts_system_before_user() {
        let request = CompletionRequest {
            system: "You are a strategist.",
            prompt: "Plan the resume.",
            model: "gpt-4o",
            api_key: Some("sk"),
            temperature: 0.5,
            max_tokens: 512,
        };
        let json = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["max_tokens"], 512);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Plan the resume.");
    }

    #[test]
    fn test_body_omits_empty_system() {
        let request = CompletionRequest {
            system: "",
            prompt: "hi",
            model: "llama-3.1-8b-instant",
            api_key: Some("gsk"),
            temperature: 0.7,
            max_tokens: 16,
        };
        let json = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_response_text_from_first_choice() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "CORE SKILLS: Rust"}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().as_deref(), Some("CORE SKILLS: Rust"));
    }

    #[test]
    fn test_response_without_choices_has_no_text() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(response.into_text().is_none());
    }
}
