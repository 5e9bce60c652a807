use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::stages::TextCompleter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Completion backend for the pipeline stages. Default: `LlmClient`.
    pub completer: Arc<dyn TextCompleter>,
}
