use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::assessment::cache::get_or_create;
use crate::assessment::generator::generate_assessment;
use crate::assessment::hasher::ContentKey;
use crate::errors::AppError;
use crate::llm_client::CompletionModel;
use crate::store::AssessmentStore;

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub assessment_id: Uuid,
    pub duration_minutes: i32,
    pub question_count: usize,
    pub cached: bool,
}

/// Knobs for a fresh generation; taken from `Config` by the handler.
#[derive(Debug, Clone, Copy)]
pub struct IntakeSettings {
    pub question_count: usize,
    pub duration_minutes: i32,
}

/// Maps extracted resume text to an assessment, generating one only for unseen text.
pub async fn upload_resume(
    store: &dyn AssessmentStore,
    llm: &dyn CompletionModel,
    resume_text: &str,
    settings: IntakeSettings,
) -> Result<UploadResponse, AppError> {
    if resume_text.trim().is_empty() {
        return Err(AppError::Validation(
            "Could not extract resume text".to_string(),
        ));
    }

    let key = ContentKey::of(resume_text);
    let lookup = get_or_create(store, &key, settings.duration_minutes, || {
        generate_assessment(llm, resume_text, settings.question_count)
    })
    .await?;

    info!(
        "Resume {key} -> assessment {} (cached: {})",
        lookup.assessment.id, lookup.cached
    );

    Ok(UploadResponse {
        assessment_id: lookup.assessment.id,
        duration_minutes: lookup.assessment.duration_minutes,
        question_count: lookup.assessment.question_count(),
        cached: lookup.cached,
    })
}
