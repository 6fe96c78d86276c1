use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::assessment::intake::{upload_resume, IntakeSettings, UploadResponse};
use crate::assessment::resume_text::extract_text;
use crate::attempt::lifecycle::{start_attempt, StartedAttempt};
use crate::errors::AppError;
use crate::extractors::{AppJson, AppPath};
use crate::state::AppState;

struct ResumeUpload {
    user_id: Uuid,
    bytes: Vec<u8>,
    content_type: Option<String>,
}

async fn read_upload(mut mp: Multipart, max_bytes: usize) -> Result<ResumeUpload, AppError> {
    let mut user_id = None;
    let mut file = None;

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        match field.name().unwrap_or("") {
            "user_id" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
                let parsed = raw
                    .trim()
                    .parse::<Uuid>()
                    .map_err(|_| AppError::Validation("user_id must be a UUID".to_string()))?;
                user_id = Some(parsed);
            }
            "resume" => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
                if bytes.len() > max_bytes {
                    return Err(AppError::Validation(format!(
                        "Resume exceeds the {max_bytes} byte limit"
                    )));
                }
                file = Some((bytes.to_vec(), content_type));
            }
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| AppError::Validation("user_id is required".into()))?;
    let (bytes, content_type) =
        file.ok_or_else(|| AppError::Validation("resume file is required".into()))?;

    Ok(ResumeUpload {
        user_id,
        bytes,
        content_type,
    })
}

/// POST /api/v1/assessments/upload
pub async fn handle_upload(
    State(state): State<AppState>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let upload = read_upload(mp?, state.config.max_upload_bytes).await?;
    tracing::info!(
        "Resume upload from user {} ({} bytes)",
        upload.user_id,
        upload.bytes.len()
    );

    let text = extract_text(upload.bytes, upload.content_type.as_deref()).await?;
    let settings = IntakeSettings {
        question_count: state.config.question_count,
        duration_minutes: state.config.assessment_duration_minutes,
    };
    let response = upload_resume(
        state.assessments.as_ref(),
        state.llm.as_ref(),
        &text,
        settings,
    )
    .await?;

    let status = if response.cached {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(response)))
}

#[derive(Deserialize)]
pub struct StartRequest {
    pub user_id: Uuid,
}

/// POST /api/v1/assessments/:id/start
pub async fn handle_start(
    State(state): State<AppState>,
    AppPath(assessment_id): AppPath<Uuid>,
    AppJson(req): AppJson<StartRequest>,
) -> Result<Json<StartedAttempt>, AppError> {
    let started = start_attempt(
        state.assessments.as_ref(),
        state.attempts.as_ref(),
        req.user_id,
        assessment_id,
        Utc::now(),
        state.config.grace_period(),
    )
    .await?;
    Ok(Json(started))
}
