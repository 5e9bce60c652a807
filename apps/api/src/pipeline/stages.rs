//! Content stages — Analyzer, Strategist, Developer.
//!
//! Each stage reads a subset of the pipeline state and returns one text
//! artifact. The only way out of the core is `TextCompleter::complete`: a
//! prompt template id, named values, and the stage's model config.
//!
//! Provider failures are fatal to the run and are never retried here; only
//! validation failures (decided by the controller) loop back to the Developer.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::errors::PipelineError;
use crate::llm_client::{strip_code_fences, LlmClient, LlmError, ModelConfig};
use crate::pipeline::creativity::CreativityLevel;
use crate::pipeline::prompts::{PromptTemplate, PromptValues};
use crate::pipeline::template_parser::{
    command_cheatsheet, reassemble, ParsedTemplate, DOCUMENT_END, DOCUMENT_START,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Analyzer,
    Strategist,
    Developer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Analyzer => "Analyzer",
            Stage::Strategist => "Strategist",
            Stage::Developer => "Developer",
        })
    }
}

/// The completion capability every stage is polymorphic over.
///
/// Carried in `AppState` as `Arc<dyn TextCompleter>`; tests substitute a
/// scripted implementation.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(
        &self,
        template: PromptTemplate,
        values: &PromptValues,
        config: &ModelConfig,
    ) -> Result<String, LlmError>;
}

#[async_trait]
impl TextCompleter for LlmClient {
    async fn complete(
        &self,
        template: PromptTemplate,
        values: &PromptValues,
        config: &ModelConfig,
    ) -> Result<String, LlmError> {
        let prompt = template.render(values);
        self.call(&prompt.user, &prompt.system, config).await
    }
}

async fn run_stage(
    stage: Stage,
    completer: &dyn TextCompleter,
    template: PromptTemplate,
    values: PromptValues,
    config: &ModelConfig,
) -> Result<String, PipelineError> {
    debug!("{stage} calling {} ({})", config.provider, config.model);

    let text = completer
        .complete(template, &values, config)
        .await
        .map_err(|source| PipelineError::Provider { stage, source })?;

    if text.trim().is_empty() {
        return Err(PipelineError::Provider {
            stage,
            source: LlmError::EmptyContent,
        });
    }

    Ok(text.trim().to_string())
}

fn optional_text(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("None.")
        .to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Analyzer
// ────────────────────────────────────────────────────────────────────────────

/// Job description → free-text analysis (core skills, keywords, hidden
/// requirements, cultural signals). Not parsed downstream; used as context.
pub async fn analyze(
    completer: &dyn TextCompleter,
    config: &ModelConfig,
    job_description: &str,
) -> Result<String, PipelineError> {
    let values = PromptValues::from([("job_description", job_description.to_string())]);
    run_stage(
        Stage::Analyzer,
        completer,
        PromptTemplate::JobAnalysis,
        values,
        config,
    )
    .await
}

// ────────────────────────────────────────────────────────────────────────────
// Strategist
// ────────────────────────────────────────────────────────────────────────────

/// Analysis + raw experience → free-text content strategy.
pub async fn strategize(
    completer: &dyn TextCompleter,
    config: &ModelConfig,
    job_analysis: &str,
    raw_experience: &str,
    custom_instructions: Option<&str>,
) -> Result<String, PipelineError> {
    let values = PromptValues::from([
        ("job_analysis", job_analysis.to_string()),
        ("experience", raw_experience.to_string()),
        ("custom_instructions", optional_text(custom_instructions)),
    ]);
    run_stage(
        Stage::Strategist,
        completer,
        PromptTemplate::ResumeStrategy,
        values,
        config,
    )
    .await
}

// ────────────────────────────────────────────────────────────────────────────
// Developer
// ────────────────────────────────────────────────────────────────────────────

/// Everything the Developer reads from the pipeline state.
#[derive(Debug, Clone, Copy)]
pub struct DeveloperInput<'a> {
    pub job_analysis: &'a str,
    pub strategy: &'a str,
    pub template: &'a ParsedTemplate,
    pub raw_experience: &'a str,
    pub creativity: CreativityLevel,
    pub custom_instructions: Option<&'a str>,
    /// Full accumulated history, empty on the first attempt.
    pub errors: &'a [String],
}

/// Produces a full candidate document: the model writes only the body, and the
/// wrapper reattaches the template's preamble and closing marker.
pub async fn develop(
    completer: &dyn TextCompleter,
    config: &ModelConfig,
    input: DeveloperInput<'_>,
) -> Result<String, PipelineError> {
    let values = PromptValues::from([
        ("strategy", input.strategy.to_string()),
        ("job_analysis", input.job_analysis.to_string()),
        ("reference_body", input.template.body.clone()),
        (
            "command_cheatsheet",
            command_cheatsheet(&input.template.commands),
        ),
        ("experience", input.raw_experience.to_string()),
        (
            "creativity_directive",
            input.creativity.directive().to_string(),
        ),
        (
            "custom_instructions",
            optional_text(input.custom_instructions),
        ),
        ("error_feedback", format_error_feedback(input.errors)),
    ]);

    let raw = run_stage(
        Stage::Developer,
        completer,
        PromptTemplate::LatexDevelopment,
        values,
        config,
    )
    .await?;

    let body = extract_body(&raw);
    Ok(reassemble(&input.template.preamble, body))
}

fn format_error_feedback(errors: &[String]) -> String {
    if errors.is_empty() {
        return "None. This is the first attempt.".to_string();
    }
    errors
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. {e}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reduces Developer output to body content: strips an enclosing code fence,
/// then, if the model emitted document markers anyway, keeps only what lies
/// between them.
pub fn extract_body(raw: &str) -> &str {
    let text = strip_code_fences(raw);

    let start = text
        .find(DOCUMENT_START)
        .map(|i| i + DOCUMENT_START.len())
        .unwrap_or(0);
    let end = text[start..]
        .find(DOCUMENT_END)
        .map(|i| start + i)
        .unwrap_or(text.len());

    text[start..end].trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::template_parser::parse_template;
    use crate::pipeline::test_support::{test_model, ScriptedCompleter};

    const TEMPLATE: &str = "\\documentclass{article}\n\\newcommand{\\entry}[2]{#1 -- #2}\n\\begin{document}\n\\entry{Old}{Role}\n\\end{document}";

    #[test]
    fn test_extract_body_strips_fences() {
        assert_eq!(extract_body("```latex\n\\section{A}\n```"), r"\section{A}");
    }

    #[test]
    fn test_extract_body_keeps_inner_document_content() {
        let raw = "Here you go:\n\\documentclass{article}\\begin{document}\n\\section{A}\n\\end{document}\nHope this helps";
        assert_eq!(extract_body(raw), r"\section{A}");
    }

    #[test]
    fn test_extract_body_with_only_end_marker() {
        assert_eq!(extract_body("\\section{A}\n\\end{document}"), r"\section{A}");
    }

    #[test]
    fn test_extract_body_plain_body_is_untouched() {
        assert_eq!(extract_body("  \\section{A}\n"), r"\section{A}");
    }

    #[test]
    fn test_error_feedback_is_numbered() {
        let errors = vec!["first".to_string(), "second".to_string()];
        assert_eq!(format_error_feedback(&errors), "1. first\n2. second");
        assert!(format_error_feedback(&[]).starts_with("None."));
    }

    #[tokio::test]
    async fn test_analyze_sends_job_description() {
        let completer = ScriptedCompleter::new(vec!["\\section{X}"]);
        let analysis = analyze(&completer, &test_model(), "Rust engineer").await.unwrap();
        assert_eq!(analysis, "CORE SKILLS: Rust");

        let calls = completer.calls();
        assert_eq!(calls[0].template, PromptTemplate::JobAnalysis);
        assert_eq!(calls[0].values["job_description"], "Rust engineer");
    }

    #[tokio::test]
    async fn test_strategize_defaults_missing_instructions() {
        let completer = ScriptedCompleter::new(vec!["\\section{X}"]);
        strategize(&completer, &test_model(), "analysis", "experience", Some("  "))
            .await
            .unwrap();
        assert_eq!(completer.calls()[0].values["custom_instructions"], "None.");
    }

    #[tokio::test]
    async fn test_develop_reattaches_preamble() {
        let parsed = parse_template(TEMPLATE).unwrap();
        let completer = ScriptedCompleter::new(vec![
            "```latex\n\\documentclass{report}\\begin{document}\\entry{New}{Lead}\\end{document}\n```",
        ]);
        let input = DeveloperInput {
            job_analysis: "analysis",
            strategy: "strategy",
            template: &parsed,
            raw_experience: "experience",
            creativity: CreativityLevel::Balanced,
            custom_instructions: None,
            errors: &[],
        };

        let candidate = develop(&completer, &test_model(), input).await.unwrap();

        assert!(candidate.starts_with(&parsed.preamble));
        assert!(candidate.contains(r"\entry{New}{Lead}"));
        assert!(!candidate.contains("report"));
        assert!(candidate.ends_with(DOCUMENT_END));

        let calls = completer.calls();
        assert!(calls[0].values["command_cheatsheet"].contains(r"\entry{arg1}{arg2}"));
        assert_eq!(calls[0].values["reference_body"], r"\entry{Old}{Role}");
    }

    #[tokio::test]
    async fn test_provider_failure_names_stage() {
        let completer = ScriptedCompleter::failing(PromptTemplate::ResumeStrategy);
        let result = strategize(&completer, &test_model(), "a", "e", None).await;
        assert!(matches!(
            result,
            Err(PipelineError::Provider {
                stage: Stage::Strategist,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_blank_completion_is_provider_error() {
        let completer = ScriptedCompleter::new(vec!["   "]);
        let parsed = parse_template(TEMPLATE).unwrap();
        let input = DeveloperInput {
            job_analysis: "a",
            strategy: "s",
            template: &parsed,
            raw_experience: "e",
            creativity: CreativityLevel::default(),
            custom_instructions: None,
            errors: &[],
        };
        let result = develop(&completer, &test_model(), input).await;
        assert!(matches!(
            result,
            Err(PipelineError::Provider {
                stage: Stage::Developer,
                source: LlmError::EmptyContent
            })
        ));
    }
}
