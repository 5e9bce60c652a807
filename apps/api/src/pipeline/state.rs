//! Pipeline State — the single record threaded through one generation run.
//!
//! Created fresh per request, owned by exactly one controller, dropped when the
//! response is built. Nothing here is shared across requests.

use serde::Serialize;

use crate::pipeline::creativity::CreativityLevel;
use crate::pipeline::template_parser::ParsedTemplate;

/// Retry budget: Developer re-entries allowed after the first attempt.
pub const MAX_REVISIONS: u32 = 3;

/// Controller states. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelinePhase {
    Parsing,
    Analyzing,
    Strategizing,
    Developing,
    Validating,
    Done,
}

/// Request inputs. Set once, never mutated.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub job_description: String,
    pub raw_experience: String,
    pub sample_template: String,
    pub creativity: CreativityLevel,
    pub custom_instructions: Option<String>,
}

#[derive(Debug)]
pub struct PipelineState {
    pub input: PipelineInput,

    // Set once by the parser.
    pub template: ParsedTemplate,

    // Stage outputs. `candidate` is overwritten on every Developer attempt.
    pub analysis: String,
    pub strategy: String,
    pub candidate: String,

    // Control fields.
    errors: Vec<String>,
    revision_count: u32,
    is_valid: bool,
}

impl PipelineState {
    pub fn new(input: PipelineInput) -> Self {
        Self {
            input,
            template: ParsedTemplate {
                preamble: String::new(),
                body: String::new(),
                commands: Vec::new(),
            },
            analysis: String::new(),
            strategy: String::new(),
            candidate: String::new(),
            errors: Vec::new(),
            revision_count: 0,
            is_valid: false,
        }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn revision_count(&self) -> u32 {
        self.revision_count
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Records one validation pass. Violations are appended to the history,
    /// never replacing earlier passes. Returns the new validity flag.
    pub fn record_validation(&mut self, violations: Vec<String>) -> bool {
        self.is_valid = violations.is_empty();
        self.errors.extend(violations);
        self.is_valid
    }

    pub fn has_retry_budget(&self) -> bool {
        self.revision_count < MAX_REVISIONS
    }

    /// Counts one retry entry into the Developer stage.
    pub fn begin_revision(&mut self) {
        debug_assert!(self.has_retry_budget());
        self.revision_count += 1;
    }

    pub fn into_outcome(self) -> PipelineOutcome {
        PipelineOutcome {
            final_latex: self.candidate,
            analysis: self.analysis,
            strategy: self.strategy,
            is_valid: self.is_valid,
            errors: self.errors,
            revision_count: self.revision_count,
        }
    }
}

/// What a finished run hands back. `is_valid = false` marks a best-effort result
/// produced after the retry budget ran out.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub final_latex: String,
    pub analysis: String,
    pub strategy: String,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub revision_count: u32,
}
