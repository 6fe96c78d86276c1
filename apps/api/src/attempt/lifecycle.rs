//! Attempt state machine.
//!
//! ```text
//! in_progress ──submit──▶ completed
//!      │
//!      └──────sweep─────▶ expired
//! ```
//!
//! Both transitions are guarded writes on the store. Whichever commits first
//! wins and the other observes `false` from the store and reports the winner.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::assessment::study_plan::generate_study_plan;
use crate::attempt::scoring::score_answers;
use crate::errors::AppError;
use crate::llm_client::CompletionModel;
use crate::models::assessment::{Assessment, Difficulty};
use crate::models::attempt::{Attempt, AttemptStatus, Outcome, StudyPlan, TopicStats};
use crate::store::{AssessmentStore, AttemptStore, StoreError};

/// Bounded retries for the insert-or-read loop in `start_attempt`.
const MAX_START_ROUNDS: usize = 3;

/// A question as shown while the test is running: no answer key.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub text: String,
    pub options: Vec<String>,
    pub topic: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedAttempt {
    pub attempt_id: Uuid,
    pub resumed: bool,
    pub duration_minutes: i32,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    pub user_id: Uuid,
    pub answers: Vec<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub attempt_id: Uuid,
    pub score: u32,
    pub percentage: f64,
    pub total_questions: usize,
    pub topic_stats: TopicStats,
    pub recommendation: StudyPlan,
}

fn question_views(assessment: &Assessment) -> Vec<QuestionView> {
    assessment
        .questions
        .iter()
        .map(|q| QuestionView {
            text: q.text.clone(),
            options: q.options.clone(),
            topic: q.topic.clone(),
            difficulty: q.difficulty,
        })
        .collect()
}

fn started(
    attempt: &Attempt,
    assessment: &Assessment,
    resumed: bool,
    grace: chrono::Duration,
) -> StartedAttempt {
    StartedAttempt {
        attempt_id: attempt.id,
        resumed,
        duration_minutes: assessment.duration_minutes,
        started_at: attempt.started_at,
        deadline: attempt.deadline(assessment.duration_minutes, grace),
        questions: question_views(assessment),
    }
}

/// Starts an attempt, or resumes the user's active one on this assessment with
/// its original `started_at`. Finished attempts are never reopened; a retake
/// gets a fresh attempt.
pub async fn start_attempt(
    assessments: &dyn AssessmentStore,
    attempts: &dyn AttemptStore,
    user_id: Uuid,
    assessment_id: Uuid,
    now: DateTime<Utc>,
    grace: chrono::Duration,
) -> Result<StartedAttempt, AppError> {
    let assessment = assessments
        .find(assessment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Assessment {assessment_id} not found")))?;

    for _ in 0..MAX_START_ROUNDS {
        if let Some(active) = attempts.find_active(user_id, assessment_id).await? {
            info!("Resuming attempt {} for user {user_id}", active.id);
            return Ok(started(&active, &assessment, true, grace));
        }

        match attempts.insert_active(user_id, assessment_id, now).await {
            Ok(attempt) => {
                info!(
                    "Started attempt {} on assessment {assessment_id} for user {user_id}",
                    attempt.id
                );
                return Ok(started(&attempt, &assessment, false, grace));
            }
            // Someone else created the active attempt between our read and write.
            Err(StoreError::UniqueViolation) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "could not settle an active attempt for user {user_id} on {assessment_id}"
    )))
}

fn reject_finished(attempt: &Attempt) -> Result<(), AppError> {
    match attempt.status {
        AttemptStatus::InProgress => Ok(()),
        AttemptStatus::Completed => Err(AppError::AlreadySubmitted {
            attempt_id: attempt.id,
        }),
        AttemptStatus::Expired => Err(AppError::Expired {
            attempt_id: attempt.id,
        }),
    }
}

/// An empty or whitespace-only answer is stored as unanswered.
fn blank_as_unanswered(answers: Vec<Option<String>>) -> Vec<Option<String>> {
    answers
        .into_iter()
        .map(|a| a.filter(|text| !text.trim().is_empty()))
        .collect()
}

/// Scores a submission and completes the attempt in one guarded write.
///
/// The study plan is generated before the write and cannot fail. If the sweep
/// expires the attempt while the plan is being generated, the write loses and
/// the caller gets `Expired`.
pub async fn submit_attempt(
    assessments: &dyn AssessmentStore,
    attempts: &dyn AttemptStore,
    llm: &dyn CompletionModel,
    attempt_id: Uuid,
    request: SubmitRequest,
    now: DateTime<Utc>,
    study_plan_timeout: Duration,
) -> Result<SubmissionResult, AppError> {
    let attempt = attempts
        .find_owned(attempt_id, request.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attempt {attempt_id} not found")))?;

    reject_finished(&attempt)?;

    let assessment = assessments
        .find(attempt.assessment_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Assessment {} not found", attempt.assessment_id))
        })?;

    if request.answers.len() != assessment.question_count() {
        return Err(AppError::Validation(format!(
            "Expected {} answers, got {}",
            assessment.question_count(),
            request.answers.len()
        )));
    }

    let answers = blank_as_unanswered(request.answers);
    let card = score_answers(&assessment.questions, &answers);
    let recommendation = generate_study_plan(llm, &card.topic_stats, study_plan_timeout).await;

    let outcome = Outcome {
        answers,
        score: card.score,
        percentage: card.percentage,
        topic_stats: card.topic_stats,
        recommendation,
        submitted_at: now,
    };

    if !attempts.complete(attempt_id, &outcome).await? {
        let current = attempts
            .find_owned(attempt_id, request.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt {attempt_id} not found")))?;
        warn!(
            "Submit for attempt {attempt_id} lost to a concurrent transition ({})",
            current.status
        );
        reject_finished(&current)?;
        return Err(AppError::Internal(anyhow::anyhow!(
            "attempt {attempt_id} refused completion while still in progress"
        )));
    }

    info!(
        "Attempt {attempt_id} completed: {}/{} ({}%)",
        outcome.score,
        assessment.question_count(),
        outcome.percentage
    );

    Ok(SubmissionResult {
        attempt_id,
        score: outcome.score,
        percentage: outcome.percentage,
        total_questions: assessment.question_count(),
        topic_stats: outcome.topic_stats,
        recommendation: outcome.recommendation,
    })
}
