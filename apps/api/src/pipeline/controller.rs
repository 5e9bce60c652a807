//! Pipeline Controller — the state machine that runs one generation request.
//!
//! Flow: Parsing → Analyzing → Strategizing → Developing → Validating →
//!       {Developing (retry) | Done}
//!
//! The only backward edge is Validating → Developing, taken while the state
//! has retry budget left. The budget is enforced here, so the run ends after at
//! most `MAX_REVISIONS + 1` Developer calls whatever the model returns.
//! Exhausting the budget is not an error: the last candidate is returned with
//! `is_valid = false` and the full violation history.

use std::time::Duration;

use tracing::{info, warn};

use crate::errors::PipelineError;
use crate::llm_client::ModelConfig;
use crate::pipeline::stages::{analyze, develop, strategize, DeveloperInput, TextCompleter};
use crate::pipeline::state::{
    PipelineInput, PipelineOutcome, PipelinePhase, PipelineState, MAX_REVISIONS,
};
use crate::pipeline::structure_validator::validate_structure;
use crate::pipeline::syntax_validator::validate_syntax;
use crate::pipeline::template_parser::parse_template;

/// Model selection per content stage, resolved before the run starts.
#[derive(Debug, Clone)]
pub struct StageModels {
    pub analyzer: ModelConfig,
    pub strategist: ModelConfig,
    pub developer: ModelConfig,
}

impl StageModels {
    #[cfg(test)]
    pub fn shared(config: ModelConfig) -> Self {
        Self {
            analyzer: config.clone(),
            strategist: config.clone(),
            developer: config,
        }
    }
}

pub struct PipelineController<'a> {
    completer: &'a dyn TextCompleter,
    models: &'a StageModels,
    state: PipelineState,
    phase: PipelinePhase,
}

impl<'a> PipelineController<'a> {
    pub fn new(
        completer: &'a dyn TextCompleter,
        models: &'a StageModels,
        input: PipelineInput,
    ) -> Self {
        Self {
            completer,
            models,
            state: PipelineState::new(input),
            phase: PipelinePhase::Parsing,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    /// Drives the machine to `Done`. Parsing and provider errors abort the run.
    pub async fn run(mut self) -> Result<PipelineOutcome, PipelineError> {
        while self.phase != PipelinePhase::Done {
            let next = self.step().await?;
            info!("Pipeline phase {:?} → {:?}", self.phase, next);
            self.phase = next;
        }

        info!(
            "Pipeline finished: valid={}, revisions={}, errors={}",
            self.state.is_valid(),
            self.state.revision_count(),
            self.state.errors().len()
        );
        Ok(self.state.into_outcome())
    }

    /// Executes the current phase and returns the next one.
    async fn step(&mut self) -> Result<PipelinePhase, PipelineError> {
        match self.phase {
            PipelinePhase::Parsing => {
                self.state.template = parse_template(&self.state.input.sample_template)?;
                info!(
                    "Template parsed: {} custom commands, body {} bytes",
                    self.state.template.commands.len(),
                    self.state.template.body.len()
                );
                Ok(PipelinePhase::Analyzing)
            }

            PipelinePhase::Analyzing => {
                self.state.analysis = analyze(
                    self.completer,
                    &self.models.analyzer,
                    &self.state.input.job_description,
                )
                .await?;
                Ok(PipelinePhase::Strategizing)
            }

            PipelinePhase::Strategizing => {
                self.state.strategy = strategize(
                    self.completer,
                    &self.models.strategist,
                    &self.state.analysis,
                    &self.state.input.raw_experience,
                    self.state.input.custom_instructions.as_deref(),
                )
                .await?;
                Ok(PipelinePhase::Developing)
            }

            PipelinePhase::Developing => {
                let input = DeveloperInput {
                    job_analysis: &self.state.analysis,
                    strategy: &self.state.strategy,
                    template: &self.state.template,
                    raw_experience: &self.state.input.raw_experience,
                    creativity: self.state.input.creativity,
                    custom_instructions: self.state.input.custom_instructions.as_deref(),
                    errors: self.state.errors(),
                };
                let candidate = develop(self.completer, &self.models.developer, input).await?;
                self.state.candidate = candidate;
                Ok(PipelinePhase::Validating)
            }

            PipelinePhase::Validating => Ok(self.validate()),

            PipelinePhase::Done => Ok(PipelinePhase::Done),
        }
    }

    fn validate(&mut self) -> PipelinePhase {
        let mut violations = validate_syntax(&self.state.candidate);
        violations.extend(validate_structure(
            &self.state.candidate,
            &self.state.input.sample_template,
        ));
        let violation_count = violations.len();

        if self.state.record_validation(violations) {
            info!(
                "Candidate passed validation after {} revision(s)",
                self.state.revision_count()
            );
            return PipelinePhase::Done;
        }

        if self.state.has_retry_budget() {
            self.state.begin_revision();
            warn!(
                "Validation failed with {violation_count} violation(s); revision {}/{MAX_REVISIONS}",
                self.state.revision_count()
            );
            PipelinePhase::Developing
        } else {
            warn!(
                "Retry budget exhausted with {violation_count} violation(s) outstanding; returning best-effort output"
            );
            PipelinePhase::Done
        }
    }
}

/// Runs one pipeline under a deadline. Expiry drops whichever stage call is in
/// flight and fails the run; no partial state escapes.
pub async fn run_pipeline(
    completer: &dyn TextCompleter,
    models: &StageModels,
    input: PipelineInput,
    deadline: Duration,
) -> Result<PipelineOutcome, PipelineError> {
    let controller = PipelineController::new(completer, models, input);

    tokio::time::timeout(deadline, controller.run())
        .await
        .map_err(|_| PipelineError::Timeout {
            seconds: deadline.as_secs(),
        })?
}
