//! Storage seam for assessments and attempts.
//!
//! The lifecycle never does read-then-write on shared state. Every write the core
//! depends on is a single conditional statement on the backend:
//! - assessment insert fails with `UniqueViolation` when the content hash exists
//! - attempt insert fails with `UniqueViolation` when the pair already has an active attempt
//! - `complete` / `expire` only apply while the attempt is still `in_progress`
//!
//! `AppState` carries both traits as `Arc<dyn _>`; production uses `PgStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::assessment::{Assessment, Question};
use crate::models::attempt::{Attempt, Outcome};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub struct NewAssessment<'a> {
    pub content_hash: &'a str,
    pub questions: &'a [Question],
    pub duration_minutes: i32,
}

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<Assessment>, StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<Assessment>, StoreError>;

    /// Fails with `UniqueViolation` if an assessment with the same hash exists.
    async fn insert(&self, new: NewAssessment<'_>) -> Result<Assessment, StoreError>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn find_active(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
    ) -> Result<Option<Attempt>, StoreError>;

    /// Creates an `in_progress` attempt. Fails with `UniqueViolation` if the
    /// (user, assessment) pair already has one.
    async fn insert_active(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<Attempt, StoreError>;

    /// Looks up an attempt by id, only if it belongs to `user_id`.
    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> Result<Option<Attempt>, StoreError>;

    /// Writes the whole outcome and flips to `completed` in one guarded step.
    /// Returns `false` if the attempt was no longer `in_progress`.
    async fn complete(&self, id: Uuid, outcome: &Outcome) -> Result<bool, StoreError>;

    /// Flips to `expired` if still `in_progress`. Returns whether it applied.
    async fn expire(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list_in_progress(&self) -> Result<Vec<Attempt>, StoreError>;

    /// Completed attempts of one user, most recently submitted first.
    async fn list_completed(&self, user_id: Uuid) -> Result<Vec<Attempt>, StoreError>;
}
