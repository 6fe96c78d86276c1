use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Expired,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(AttemptStatus::InProgress),
            "completed" => Ok(AttemptStatus::Completed),
            "expired" => Ok(AttemptStatus::Expired),
            other => Err(format!("unknown attempt status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicStat {
    pub correct: u32,
    pub total: u32,
}

impl TopicStat {
    /// Fraction correct in `[0, 1]`; a topic with no questions counts as 0.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }
}

/// Per-topic tallies. Ordered by topic name so every projection is deterministic.
pub type TopicStats = BTreeMap<String, TopicStat>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyDay {
    pub day: u32,
    pub focus: String,
    pub tasks: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyPlan {
    pub weak_areas: Vec<String>,
    pub study_plan: Vec<StudyDay>,
    pub recommendations: Vec<String>,
}

/// Everything a submission writes. Either all of it is on an attempt or none of it is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub answers: Vec<Option<String>>,
    pub score: u32,
    pub percentage: f64,
    pub topic_stats: TopicStats,
    pub recommendation: StudyPlan,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assessment_id: Uuid,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub outcome: Option<Outcome>,
    pub created_at: DateTime<Utc>,
}

impl Attempt {
    /// Server-side cutoff after which the sweep expires this attempt.
    pub fn deadline(&self, duration_minutes: i32, grace: Duration) -> DateTime<Utc> {
        deadline(self.started_at, duration_minutes, grace)
    }
}

pub fn deadline(started_at: DateTime<Utc>, duration_minutes: i32, grace: Duration) -> DateTime<Utc> {
    started_at + Duration::minutes(i64::from(duration_minutes)) + grace
}

#[derive(Debug, FromRow)]
pub struct AttemptRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assessment_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub answers: Option<Json<Vec<Option<String>>>>,
    pub score: Option<i32>,
    pub percentage: Option<f64>,
    pub topic_stats: Option<Json<TopicStats>>,
    pub recommendation: Option<Json<StudyPlan>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AttemptRow> for Attempt {
    type Error = String;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        let status: AttemptStatus = row.status.parse()?;

        let outcome = match (
            row.answers,
            row.score,
            row.percentage,
            row.topic_stats,
            row.recommendation,
            row.submitted_at,
        ) {
            (
                Some(Json(answers)),
                Some(score),
                Some(percentage),
                Some(Json(topic_stats)),
                Some(Json(recommendation)),
                Some(submitted_at),
            ) => Some(Outcome {
                answers,
                score: u32::try_from(score).map_err(|_| format!("negative score {score}"))?,
                percentage,
                topic_stats,
                recommendation,
                submitted_at,
            }),
            (None, None, None, None, None, None) => None,
            _ => return Err(format!("attempt {} is partially scored", row.id)),
        };

        if (status == AttemptStatus::Completed) != outcome.is_some() {
            return Err(format!(
                "attempt {} has status {status} but outcome present = {}",
                row.id,
                outcome.is_some()
            ));
        }

        Ok(Attempt {
            id: row.id,
            user_id: row.user_id,
            assessment_id: row.assessment_id,
            status,
            started_at: row.started_at,
            outcome,
            created_at: row.created_at,
        })
    }
}
