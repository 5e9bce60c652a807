//! Scripted completion fake shared by the pipeline and handler tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm_client::{LlmError, ModelConfig, ProviderKind};
use crate::pipeline::prompts::{PromptTemplate, PromptValues};
use crate::pipeline::stages::TextCompleter;

pub const ANALYSIS_REPLY: &str = "CORE SKILLS: Rust";
pub const STRATEGY_REPLY: &str = "SUMMARY APPROACH: lead with Rust";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub template: PromptTemplate,
    pub values: PromptValues,
    pub model: String,
}

/// Answers the Analyzer and Strategist with fixed text and the Developer from a
/// queue; the last Developer reply repeats once the queue is drained.
pub struct ScriptedCompleter {
    developer_replies: Mutex<VecDeque<String>>,
    fail_on: Option<PromptTemplate>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedCompleter {
    pub fn new(developer_replies: Vec<&str>) -> Self {
        Self {
            developer_replies: Mutex::new(developer_replies.into_iter().map(String::from).collect()),
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call for `template` fails with a 500 from the provider.
    pub fn failing(template: PromptTemplate) -> Self {
        Self {
            fail_on: Some(template),
            ..Self::new(vec!["\\section{Unused}"])
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn developer_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.template == PromptTemplate::LatexDevelopment)
            .collect()
    }
}

#[async_trait]
impl TextCompleter for ScriptedCompleter {
    async fn complete(
        &self,
        template: PromptTemplate,
        values: &PromptValues,
        config: &ModelConfig,
    ) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            template,
            values: values.clone(),
            model: config.model.clone(),
        });

        if self.fail_on == Some(template) {
            return Err(LlmError::Api {
                status: 500,
                message: "upstream unavailable".to_string(),
            });
        }

        Ok(match template {
            PromptTemplate::JobAnalysis => ANALYSIS_REPLY.to_string(),
            PromptTemplate::ResumeStrategy => STRATEGY_REPLY.to_string(),
            PromptTemplate::LatexDevelopment => {
                let mut replies = self.developer_replies.lock().unwrap();
                if replies.len() > 1 {
                    replies.pop_front().unwrap_or_default()
                } else {
                    replies.front().cloned().unwrap_or_default()
                }
            }
        })
    }
}

/// Never answers; used to exercise deadlines.
pub struct HangingCompleter;

#[async_trait]
impl TextCompleter for HangingCompleter {
    async fn complete(
        &self,
        _template: PromptTemplate,
        _values: &PromptValues,
        _config: &ModelConfig,
    ) -> Result<String, LlmError> {
        std::future::pending().await
    }
}

pub fn test_model() -> ModelConfig {
    ModelConfig {
        provider: ProviderKind::Ollama,
        model: "llama3.2".to_string(),
        api_key: None,
        temperature: 0.7,
    }
}
