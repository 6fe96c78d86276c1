use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::CompletionModel;
use crate::store::{AssessmentStore, AttemptStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub assessments: Arc<dyn AssessmentStore>,
    pub attempts: Arc<dyn AttemptStore>,
    /// `LlmClient` in production.
    pub llm: Arc<dyn CompletionModel>,
    pub config: Config,
}
