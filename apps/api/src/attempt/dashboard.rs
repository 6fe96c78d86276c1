use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::assessment::Difficulty;
use crate::models::attempt::{Attempt, AttemptStatus, StudyPlan, TopicStats};
use crate::store::{AssessmentStore, AttemptStore};

// ── Dashboard ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AttemptSummary {
    pub attempt_id: Uuid,
    pub assessment_id: Uuid,
    pub score: u32,
    pub percentage: f64,
    pub total_questions: usize,
    pub started_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_attempts: usize,
    pub average_percentage: f64,
    pub attempts: Vec<AttemptSummary>,
}

fn summarize(attempt: &Attempt) -> Option<AttemptSummary> {
    let outcome = attempt.outcome.as_ref()?;
    Some(AttemptSummary {
        attempt_id: attempt.id,
        assessment_id: attempt.assessment_id,
        score: outcome.score,
        percentage: outcome.percentage,
        total_questions: outcome.answers.len(),
        started_at: attempt.started_at,
        submitted_at: outcome.submitted_at,
    })
}

/// Mean of the percentages rounded to one decimal, 0 for no attempts.
fn average_percentage(attempts: &[AttemptSummary]) -> f64 {
    if attempts.is_empty() {
        return 0.0;
    }
    let sum: f64 = attempts.iter().map(|a| a.percentage).sum();
    (sum / attempts.len() as f64 * 10.0).round() / 10.0
}

/// Completed attempts of `user_id`, most recently submitted first.
pub async fn get_dashboard(
    attempts: &dyn AttemptStore,
    user_id: Uuid,
) -> Result<Dashboard, AppError> {
    let completed = attempts.list_completed(user_id).await?;
    let summaries: Vec<AttemptSummary> = completed.iter().filter_map(summarize).collect();

    Ok(Dashboard {
        total_attempts: summaries.len(),
        average_percentage: average_percentage(&summaries),
        attempts: summaries,
    })
}

// ── Result ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct QuestionResult {
    pub text: String,
    pub options: Vec<String>,
    pub correct_option: String,
    pub user_answer: Option<String>,
    pub is_correct: bool,
    pub topic: String,
    pub difficulty: Difficulty,
}

/// Score fields are `None` until the attempt is completed.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptResult {
    pub attempt_id: Uuid,
    pub assessment_id: Uuid,
    pub status: AttemptStatus,
    pub score: Option<u32>,
    pub percentage: Option<f64>,
    pub total_questions: usize,
    pub topic_stats: Option<TopicStats>,
    pub recommendation: Option<StudyPlan>,
    pub questions: Vec<QuestionResult>,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

pub async fn get_result(
    assessments: &dyn AssessmentStore,
    attempts: &dyn AttemptStore,
    attempt_id: Uuid,
    user_id: Uuid,
) -> Result<AttemptResult, AppError> {
    let attempt = attempts
        .find_owned(attempt_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attempt {attempt_id} not found")))?;

    let questions = match assessments.find(attempt.assessment_id).await? {
        Some(assessment) => assessment.questions,
        None => {
            warn!(
                "Attempt {attempt_id} references missing assessment {}",
                attempt.assessment_id
            );
            Vec::new()
        }
    };

    let answers = attempt
        .outcome
        .as_ref()
        .map(|o| o.answers.as_slice())
        .unwrap_or_default();

    let per_question: Vec<QuestionResult> = questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| {
            let user_answer = answers.get(i).cloned().flatten();
            let is_correct = user_answer.as_deref() == Some(q.correct_option.as_str());
            QuestionResult {
                text: q.text,
                options: q.options,
                correct_option: q.correct_option,
                user_answer,
                is_correct,
                topic: q.topic,
                difficulty: q.difficulty,
            }
        })
        .collect();

    let outcome = attempt.outcome;
    Ok(AttemptResult {
        attempt_id: attempt.id,
        assessment_id: attempt.assessment_id,
        status: attempt.status,
        score: outcome.as_ref().map(|o| o.score),
        percentage: outcome.as_ref().map(|o| o.percentage),
        total_questions: per_question.len(),
        topic_stats: outcome.as_ref().map(|o| o.topic_stats.clone()),
        submitted_at: outcome.as_ref().map(|o| o.submitted_at),
        recommendation: outcome.map(|o| o.recommendation),
        questions: per_question,
        started_at: attempt.started_at,
    })
}
