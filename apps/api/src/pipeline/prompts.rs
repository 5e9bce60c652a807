// All LLM prompt templates for the generation pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::llm_client::prompts::{PLAIN_TEXT_ONLY, RAW_LATEX_ONLY, TRUTHFULNESS_INSTRUCTION};

/// Named values substituted into a template's `{placeholder}` slots.
pub type PromptValues = BTreeMap<&'static str, String>;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

/// Identifies one stage's prompt. The pipeline hands this id and a value map to
/// the completion capability; it never builds prompt strings itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    JobAnalysis,
    ResumeStrategy,
    LatexDevelopment,
}

/// A template after substitution, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

impl PromptTemplate {
    pub fn system(self) -> String {
        match self {
            PromptTemplate::JobAnalysis => format!("{ANALYZER_SYSTEM} {PLAIN_TEXT_ONLY}"),
            PromptTemplate::ResumeStrategy => {
                format!("{STRATEGIST_SYSTEM} {PLAIN_TEXT_ONLY} {TRUTHFULNESS_INSTRUCTION}")
            }
            PromptTemplate::LatexDevelopment => {
                format!("{DEVELOPER_SYSTEM} {RAW_LATEX_ONLY} {TRUTHFULNESS_INSTRUCTION}")
            }
        }
    }

    pub fn user_template(self) -> &'static str {
        match self {
            PromptTemplate::JobAnalysis => ANALYZER_PROMPT_TEMPLATE,
            PromptTemplate::ResumeStrategy => STRATEGIST_PROMPT_TEMPLATE,
            PromptTemplate::LatexDevelopment => DEVELOPER_PROMPT_TEMPLATE,
        }
    }

    /// Values the template expects. Stages must supply every one.
    pub fn placeholders(self) -> &'static [&'static str] {
        match self {
            PromptTemplate::JobAnalysis => &["job_description"],
            PromptTemplate::ResumeStrategy => {
                &["job_analysis", "experience", "custom_instructions"]
            }
            PromptTemplate::LatexDevelopment => &[
                "strategy",
                "job_analysis",
                "reference_body",
                "command_cheatsheet",
                "experience",
                "creativity_directive",
                "custom_instructions",
                "error_feedback",
            ],
        }
    }

    /// Substitutes values in a single pass, so braces inside values (LaTeX is
    /// full of them) are never re-interpreted as placeholders. Unknown
    /// placeholders are left as written.
    pub fn render(self, values: &PromptValues) -> RenderedPrompt {
        debug_assert!(
            self.placeholders().iter().all(|key| values.contains_key(key)),
            "{self:?} rendered without every placeholder value"
        );

        let user = PLACEHOLDER_RE
            .replace_all(self.user_template(), |caps: &Captures<'_>| {
                values
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();

        RenderedPrompt {
            system: self.system(),
            user,
        }
    }
}

/// System prompt for the Analyzer stage.
pub const ANALYZER_SYSTEM: &str = "You are an expert talent acquisition specialist. \
    Extract the critical signal from a job description so a candidate can tailor \
    their resume to it.";

/// Analyzer prompt. Replace: {job_description}
pub const ANALYZER_PROMPT_TEMPLATE: &str = r#"Analyze the job description below and write your analysis under these four headings:

CORE SKILLS: the 3-5 hard skills the role absolutely requires.
KEYWORDS: specific terms, tools and phrases an applicant tracking system will search for.
HIDDEN REQUIREMENTS: the underlying problem they are hiring to solve (e.g. scaling a legacy system, building a team from scratch).
CULTURAL SIGNALS: the tone of the company (e.g. fast-paced startup, structured enterprise, research lab).

JOB DESCRIPTION:
{job_description}"#;

/// System prompt for the Strategist stage.
pub const STRATEGIST_SYSTEM: &str = "You are a senior career coach and resume strategist. \
    You plan how a resume should bridge a candidate's experience and a target job. \
    You do NOT write the resume itself.";

/// Strategist prompt. Replace: {job_analysis}, {experience}, {custom_instructions}
pub const STRATEGIST_PROMPT_TEMPLATE: &str = r#"Using the job analysis and the candidate's experience, write a content strategy under these four headings:

SUMMARY APPROACH: the 2-3 strengths the professional summary should lead with.
EXPERIENCE SELECTION: which roles and projects to feature, and which to minimize or drop.
PHRASING ANGLES: for each featured role, how to frame its achievements against the analysis (e.g. lead with the cloud migration, not the maintenance work).
KEYWORD PLACEMENT: which keywords from the analysis must appear, and where.

Be specific and tactical.

JOB ANALYSIS:
{job_analysis}

CANDIDATE EXPERIENCE:
{experience}

ADDITIONAL INSTRUCTIONS FROM THE CANDIDATE:
{custom_instructions}"#;

/// System prompt for the Developer stage.
pub const DEVELOPER_SYSTEM: &str = "You are an expert LaTeX developer and resume writer. \
    You write the BODY of a LaTeX resume, following a content strategy and the exact \
    conventions of a reference template. The preamble and document boundaries are \
    handled for you.";

/// Developer prompt. Replace: {strategy}, {job_analysis}, {reference_body},
/// {command_cheatsheet}, {experience}, {creativity_directive},
/// {custom_instructions}, {error_feedback}
pub const DEVELOPER_PROMPT_TEMPLATE: &str = r#"STRATEGY PLAN (what to write and emphasize):
{strategy}

JOB ANALYSIS:
{job_analysis}

REFERENCE BODY (how it should look; reuse its structure and commands):
{reference_body}

{command_cheatsheet}

CANDIDATE RAW EXPERIENCE (the only source of facts):
{experience}

{creativity_directive}

ADDITIONAL INSTRUCTIONS FROM THE CANDIDATE:
{custom_instructions}

ERRORS FROM PREVIOUS ATTEMPTS (fix every one):
{error_feedback}

HARD RULES:
1. Output ONLY the document body: the content that goes between \begin{document} and \end{document}
2. Do NOT output \documentclass, \usepackage, command definitions, \begin{document} or \end{document}
3. Use the custom commands above with exactly the listed number of arguments
4. Every \begin{...} must have a matching \end{...}; every { must have a matching }
5. Escape LaTeX special characters in content (%, &, $, #, _)"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn full_values(template: PromptTemplate) -> PromptValues {
        template
            .placeholders()
            .iter()
            .map(|name| (*name, format!("<{name}>")))
            .collect()
    }

    #[test]
    fn test_every_placeholder_is_substituted() {
        for template in [
            PromptTemplate::JobAnalysis,
            PromptTemplate::ResumeStrategy,
            PromptTemplate::LatexDevelopment,
        ] {
            let rendered = template.render(&full_values(template));
            for name in template.placeholders() {
                assert!(
                    !rendered.user.contains(&format!("{{{name}}}")),
                    "{template:?} left {{{name}}} unresolved"
                );
                assert!(rendered.user.contains(&format!("<{name}>")));
            }
        }
    }

    #[test]
    fn test_latex_in_values_is_not_reinterpreted() {
        let mut values = full_values(PromptTemplate::LatexDevelopment);
        values.insert("reference_body", r"\section{Experience} {strategy}".to_string());
        let rendered = PromptTemplate::LatexDevelopment.render(&values);
        assert!(rendered.user.contains(r"\section{Experience} {strategy}"));
    }

    #[test]
    fn test_literal_latex_in_template_survives() {
        let rendered =
            PromptTemplate::LatexDevelopment.render(&full_values(PromptTemplate::LatexDevelopment));
        assert!(rendered.user.contains(r"\begin{document} and \end{document}"));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "without every placeholder value")]
    fn test_missing_value_is_caught_in_debug_builds() {
        let mut values = full_values(PromptTemplate::ResumeStrategy);
        values.remove("experience");
        PromptTemplate::ResumeStrategy.render(&values);
    }

    #[test]
    fn test_system_prompts_carry_shared_fragments() {
        assert!(PromptTemplate::LatexDevelopment
            .system()
            .contains(RAW_LATEX_ONLY));
        assert!(PromptTemplate::JobAnalysis.system().contains(PLAIN_TEXT_ONLY));
    }
}
