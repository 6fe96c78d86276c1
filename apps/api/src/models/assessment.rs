use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Number of answer options every question must carry.
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Lenient parse used on model output: trims and ignores case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// A single multiple-choice question. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    pub correct_option: String,
    pub topic: String,
    pub difficulty: Difficulty,
}

/// A generated assessment, keyed by the content hash of the resume it came from.
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub id: Uuid,
    pub content_hash: String,
    pub questions: Vec<Question>,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
}

impl Assessment {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

#[derive(Debug, FromRow)]
pub struct AssessmentRow {
    pub id: Uuid,
    pub content_hash: String,
    pub questions: Json<Vec<Question>>,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
}

impl From<AssessmentRow> for Assessment {
    fn from(row: AssessmentRow) -> Self {
        Assessment {
            id: row.id,
            content_hash: row.content_hash,
            questions: row.questions.0,
            duration_minutes: row.duration_minutes,
            created_at: row.created_at,
        }
    }
}
