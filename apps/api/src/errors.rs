use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::pipeline::stages::Stage;

/// Fatal failures of one pipeline run.
///
/// Validation failures are deliberately absent: they are recorded in the
/// pipeline state and drive the retry loop, they never abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Malformed template: {0}")]
    MalformedTemplate(String),

    #[error("{stage} stage failed: {source}")]
    Provider {
        stage: Stage,
        #[source]
        source: LlmError,
    },

    #[error("Pipeline exceeded its {seconds}s deadline")]
    Timeout { seconds: u64 },
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed template: {0}")]
    MalformedTemplate(String),

    #[error("Provider error in {stage} stage: {message}")]
    Provider { stage: Stage, message: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::MalformedTemplate(msg) => AppError::MalformedTemplate(msg),
            PipelineError::Provider { stage, source } => AppError::Provider {
                stage,
                message: source.to_string(),
            },
            timeout @ PipelineError::Timeout { .. } => AppError::Timeout(timeout.to_string()),
        }
    }
}

// Malformed or mistyped bodies are client errors, reported in the same envelope.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::MalformedTemplate(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MALFORMED_TEMPLATE",
                msg.clone(),
            ),
            AppError::Provider { stage, message } => {
                tracing::error!("Provider error in {stage} stage: {message}");
                (
                    StatusCode::BAD_GATEWAY,
                    "PROVIDER_ERROR",
                    format!("{stage} stage failed: {message}"),
                )
            }
            AppError::Timeout(msg) => {
                tracing::warn!("{msg}");
                (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_names_stage() {
        let err = PipelineError::Provider {
            stage: Stage::Strategist,
            source: LlmError::EmptyContent,
        };
        assert_eq!(
            err.to_string(),
            "Strategist stage failed: LLM returned empty content"
        );
    }

    #[test]
    fn test_pipeline_errors_map_to_status_codes() {
        let cases = [
            (
                AppError::from(PipelineError::MalformedTemplate("no start".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::from(PipelineError::Provider {
                    stage: Stage::Analyzer,
                    source: LlmError::EmptyContent,
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::from(PipelineError::Timeout { seconds: 30 }),
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
