use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::attempt::dashboard::{get_dashboard, get_result, AttemptResult, Dashboard};
use crate::attempt::lifecycle::{submit_attempt, SubmissionResult, SubmitRequest};
use crate::errors::AppError;
use crate::extractors::{AppJson, AppPath, AppQuery};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// POST /api/v1/attempts/:id/submit
pub async fn handle_submit(
    State(state): State<AppState>,
    AppPath(attempt_id): AppPath<Uuid>,
    AppJson(req): AppJson<SubmitRequest>,
) -> Result<Json<SubmissionResult>, AppError> {
    let result = submit_attempt(
        state.assessments.as_ref(),
        state.attempts.as_ref(),
        state.llm.as_ref(),
        attempt_id,
        req,
        Utc::now(),
        state.config.study_plan_timeout(),
    )
    .await?;
    Ok(Json(result))
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<UserIdQuery>,
) -> Result<Json<Dashboard>, AppError> {
    let dashboard = get_dashboard(state.attempts.as_ref(), params.user_id).await?;
    Ok(Json(dashboard))
}

/// GET /api/v1/attempts/:id/result
pub async fn handle_result(
    State(state): State<AppState>,
    AppPath(attempt_id): AppPath<Uuid>,
    AppQuery(params): AppQuery<UserIdQuery>,
) -> Result<Json<AttemptResult>, AppError> {
    let result = get_result(
        state.assessments.as_ref(),
        state.attempts.as_ref(),
        attempt_id,
        params.user_id,
    )
    .await?;
    Ok(Json(result))
}
