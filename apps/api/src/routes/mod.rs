pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::assessment::handlers as assessment;
use crate::attempt::handlers as attempt;
use crate::state::AppState;

/// Multipart framing on top of the resume bytes themselves.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + UPLOAD_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Assessments
        .route("/api/v1/assessments/upload", post(assessment::handle_upload))
        .route(
            "/api/v1/assessments/:id/start",
            post(assessment::handle_start),
        )
        // Attempts
        .route("/api/v1/attempts/:id/submit", post(attempt::handle_submit))
        .route("/api/v1/attempts/:id/result", get(attempt::handle_result))
        .route("/api/v1/dashboard", get(attempt::handle_dashboard))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
