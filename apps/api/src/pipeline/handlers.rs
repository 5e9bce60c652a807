//! Axum route handlers for the generation pipeline.
//!
//! The handler is where per-request model configuration is resolved: request
//! values first, then the immutable startup `Config`. The pipeline itself never
//! reads configuration.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::{ModelConfig, ProviderKind};
use crate::pipeline::controller::{run_pipeline, StageModels};
use crate::pipeline::creativity::CreativityLevel;
use crate::pipeline::stages::Stage;
use crate::pipeline::state::{PipelineInput, PipelineOutcome};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Model selection as sent by a client. Every field but `provider` is optional.
#[derive(Clone, Deserialize)]
pub struct ModelConfigInput {
    pub provider: ProviderKind,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Request body for resume generation.
///
/// `model_config` applies to every stage; a per-stage config overrides it for
/// that stage only.
#[derive(Deserialize)]
pub struct GenerateRequest {
    pub job_description: String,
    pub raw_experience: String,
    pub sample_latex: String,
    #[serde(default)]
    pub model_config: Option<ModelConfigInput>,
    #[serde(default)]
    pub analyzer_config: Option<ModelConfigInput>,
    #[serde(default)]
    pub strategist_config: Option<ModelConfigInput>,
    #[serde(default)]
    pub developer_config: Option<ModelConfigInput>,
    #[serde(default)]
    pub creativity_level: Option<u8>,
    #[serde(default)]
    pub custom_instructions: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub outcome: PipelineOutcome,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub id: ProviderKind,
    pub display_name: &'static str,
    pub requires_api_key: bool,
    /// The server holds a fallback credential, so clients may omit `api_key`.
    pub has_server_key: bool,
    pub default_model: &'static str,
    pub models: &'static [&'static str],
}

// ────────────────────────────────────────────────────────────────────────────
// Model resolution
// ────────────────────────────────────────────────────────────────────────────

const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// Resolves the three stage configs: stage config → shared config → server default.
pub fn resolve_stage_models(
    request: &GenerateRequest,
    config: &Config,
    creativity: CreativityLevel,
) -> Result<StageModels, AppError> {
    let shared = request.model_config.as_ref();

    Ok(StageModels {
        analyzer: resolve_model(
            Stage::Analyzer,
            request.analyzer_config.as_ref().or(shared),
            config,
            creativity,
        )?,
        strategist: resolve_model(
            Stage::Strategist,
            request.strategist_config.as_ref().or(shared),
            config,
            creativity,
        )?,
        developer: resolve_model(
            Stage::Developer,
            request.developer_config.as_ref().or(shared),
            config,
            creativity,
        )?,
    })
}

fn resolve_model(
    stage: Stage,
    input: Option<&ModelConfigInput>,
    config: &Config,
    creativity: CreativityLevel,
) -> Result<ModelConfig, AppError> {
    let provider = input.map_or(config.default_provider, |c| c.provider);

    let model = input
        .and_then(|c| c.model.as_deref())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            if provider == config.default_provider {
                config.default_model.clone()
            } else {
                provider.default_model().to_string()
            }
        });

    let api_key = input
        .and_then(|c| c.api_key.as_deref())
        .filter(|k| !k.trim().is_empty())
        .or_else(|| config.api_key_for(provider))
        .map(str::to_string);

    if provider.requires_api_key() && api_key.is_none() {
        return Err(AppError::Validation(format!(
            "API key for {provider} is required for the {stage} stage"
        )));
    }

    let temperature = input
        .and_then(|c| c.temperature)
        .unwrap_or_else(|| creativity.temperature());
    if !TEMPERATURE_RANGE.contains(&temperature) {
        return Err(AppError::Validation(format!(
            "temperature for the {stage} stage must be between 0.0 and 2.0, got {temperature}"
        )));
    }

    Ok(ModelConfig {
        provider,
        model,
        api_key,
        temperature,
    })
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resumes/generate
///
/// Runs Analyzer → Strategist → Developer with validation retries. A result that
/// never validated still returns 200, with `is_valid: false` and its errors.
pub async fn handle_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(request) = payload?;
    require_text("job_description", &request.job_description)?;
    require_text("raw_experience", &request.raw_experience)?;
    require_text("sample_latex", &request.sample_latex)?;

    let creativity = CreativityLevel::from_level(request.creativity_level);
    let models = resolve_stage_models(&request, &state.config, creativity)?;

    let request_id = Uuid::new_v4();
    let span = info_span!("generate", %request_id);

    info!(
        parent: &span,
        "Generating resume: analyzer={} ({}), strategist={} ({}), developer={} ({}), creativity={:?}",
        models.analyzer.provider,
        models.analyzer.model,
        models.strategist.provider,
        models.strategist.model,
        models.developer.provider,
        models.developer.model,
        creativity
    );

    let input = PipelineInput {
        job_description: request.job_description,
        raw_experience: request.raw_experience,
        sample_template: request.sample_latex,
        creativity,
        custom_instructions: request.custom_instructions,
    };

    let outcome = run_pipeline(
        state.completer.as_ref(),
        &models,
        input,
        state.config.pipeline_timeout,
    )
    .instrument(span.clone())
    .await?;

    info!(
        parent: &span,
        "Generation finished: valid={}, revisions={}, errors={}",
        outcome.is_valid,
        outcome.revision_count,
        outcome.errors.len()
    );

    Ok(Json(GenerateResponse {
        request_id,
        outcome,
        generated_at: Utc::now(),
    }))
}

/// GET /api/v1/providers
///
/// Lists the supported providers with their suggested models.
pub async fn handle_list_providers(State(state): State<AppState>) -> Json<Vec<ProviderInfo>> {
    let providers = ProviderKind::ALL
        .into_iter()
        .map(|kind| ProviderInfo {
            id: kind,
            display_name: kind.display_name(),
            requires_api_key: kind.requires_api_key(),
            has_server_key: state.config.api_key_for(kind).is_some(),
            default_model: kind.default_model(),
            models: kind.suggested_models(),
        })
        .collect();

    Json(providers)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
