use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::assessment::{Assessment, AssessmentRow};
use crate::models::attempt::{Attempt, AttemptRow, AttemptStatus, Outcome};
use crate::store::{AssessmentStore, AttemptStore, NewAssessment, StoreError};

const ASSESSMENT_COLUMNS: &str = "id, content_hash, questions, duration_minutes, created_at";

const ATTEMPT_COLUMNS: &str = "id, user_id, assessment_id, status, started_at, submitted_at, \
     answers, score, percentage, topic_stats, recommendation, created_at";

/// Postgres-backed store. Uniqueness and status guards live in the schema and
/// in the `WHERE` clauses below, never in application-side checks.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_attempt(row: AttemptRow) -> Result<Attempt, StoreError> {
    Attempt::try_from(row).map_err(StoreError::Corrupt)
}

fn into_attempts(rows: Vec<AttemptRow>) -> Result<Vec<Attempt>, StoreError> {
    rows.into_iter().map(into_attempt).collect()
}

#[async_trait]
impl AssessmentStore for PgStore {
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<Assessment>, StoreError> {
        let row = sqlx::query_as::<_, AssessmentRow>(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE content_hash = $1"
        ))
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Assessment::from))
    }

    async fn find(&self, id: Uuid) -> Result<Option<Assessment>, StoreError> {
        let row = sqlx::query_as::<_, AssessmentRow>(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Assessment::from))
    }

    async fn insert(&self, new: NewAssessment<'_>) -> Result<Assessment, StoreError> {
        // DO NOTHING returns no row on conflict, which keeps the loser's
        // connection usable for the follow-up read.
        let row = sqlx::query_as::<_, AssessmentRow>(&format!(
            r#"
            INSERT INTO assessments (id, content_hash, questions, duration_minutes)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (content_hash) DO NOTHING
            RETURNING {ASSESSMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.content_hash)
        .bind(Json(new.questions))
        .bind(new.duration_minutes)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Assessment::from).ok_or(StoreError::UniqueViolation)
    }
}

#[async_trait]
impl AttemptStore for PgStore {
    async fn find_active(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
    ) -> Result<Option<Attempt>, StoreError> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            r#"
            SELECT {ATTEMPT_COLUMNS} FROM attempts
            WHERE user_id = $1 AND assessment_id = $2 AND status = 'in_progress'
            "#
        ))
        .bind(user_id)
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(into_attempt).transpose()
    }

    async fn insert_active(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<Attempt, StoreError> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            r#"
            INSERT INTO attempts (id, user_id, assessment_id, status, started_at)
            VALUES ($1, $2, $3, 'in_progress', $4)
            ON CONFLICT (user_id, assessment_id) WHERE status = 'in_progress' DO NOTHING
            RETURNING {ATTEMPT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(assessment_id)
        .bind(started_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_attempt)
            .transpose()?
            .ok_or(StoreError::UniqueViolation)
    }

    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> Result<Option<Attempt>, StoreError> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(into_attempt).transpose()
    }

    async fn complete(&self, id: Uuid, outcome: &Outcome) -> Result<bool, StoreError> {
        let score = i32::try_from(outcome.score)
            .map_err(|_| StoreError::Corrupt(format!("score {} out of range", outcome.score)))?;

        let result = sqlx::query(
            r#"
            UPDATE attempts
            SET status = $2,
                answers = $3,
                score = $4,
                percentage = $5,
                topic_stats = $6,
                recommendation = $7,
                submitted_at = $8
            WHERE id = $1 AND status = 'in_progress'
            "#,
        )
        .bind(id)
        .bind(AttemptStatus::Completed.as_str())
        .bind(Json(&outcome.answers))
        .bind(score)
        .bind(outcome.percentage)
        .bind(Json(&outcome.topic_stats))
        .bind(Json(&outcome.recommendation))
        .bind(outcome.submitted_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn expire(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE attempts SET status = $2 WHERE id = $1 AND status = 'in_progress'",
        )
        .bind(id)
        .bind(AttemptStatus::Expired.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_in_progress(&self) -> Result<Vec<Attempt>, StoreError> {
        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE status = 'in_progress' ORDER BY started_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        into_attempts(rows)
    }

    async fn list_completed(&self, user_id: Uuid) -> Result<Vec<Attempt>, StoreError> {
        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            r#"
            SELECT {ATTEMPT_COLUMNS} FROM attempts
            WHERE user_id = $1 AND status = 'completed'
            ORDER BY submitted_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        into_attempts(rows)
    }
}

// These run against a real database and are skipped unless DATABASE_URL is set.
// Every test works on fresh uuids and hashes, so a shared database is fine.
#[cfg(test)]
mod tests {
    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::models::assessment::{Difficulty, Question};
    use crate::models::attempt::{StudyPlan, TopicStat, TopicStats};

    async fn test_store() -> Option<PgStore> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping Postgres store test");
            return None;
        };

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&database_url)
            .await
            .expect("Failed to connect to Postgres for testing");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to migrate database");

        Some(PgStore::new(pool))
    }

    fn questions() -> Vec<Question> {
        vec![Question {
            text: "Which keyword moves ownership into a closure?".into(),
            options: vec!["move".into(), "ref".into(), "box".into(), "dyn".into()],
            correct_option: "move".into(),
            topic: "Rust".into(),
            difficulty: Difficulty::Easy,
        }]
    }

    async fn seed_assessment(store: &PgStore) -> Assessment {
        let hash = format!("test-{}", Uuid::new_v4());
        store
            .insert(NewAssessment {
                content_hash: &hash,
                questions: &questions(),
                duration_minutes: 35,
            })
            .await
            .unwrap()
    }

    /// Postgres keeps microseconds; whole seconds survive a round trip exactly.
    fn whole_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
        DateTime::from_timestamp(at.timestamp(), 0).unwrap()
    }

    fn outcome(submitted_at: DateTime<Utc>) -> Outcome {
        let mut topic_stats = TopicStats::new();
        topic_stats.insert(
            "Rust".into(),
            TopicStat {
                correct: 1,
                total: 1,
            },
        );
        Outcome {
            answers: vec![Some("move".into())],
            score: 1,
            percentage: 100.0,
            topic_stats,
            recommendation: StudyPlan {
                weak_areas: vec![],
                study_plan: vec![],
                recommendations: vec!["Keep going".into()],
            },
            submitted_at: whole_seconds(submitted_at),
        }
    }

    #[tokio::test]
    async fn test_duplicate_hash_is_unique_violation() {
        let Some(store) = test_store().await else { return };
        let first = seed_assessment(&store).await;

        let err = store
            .insert(NewAssessment {
                content_hash: &first.content_hash,
                questions: &questions(),
                duration_minutes: 35,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::UniqueViolation));
        let found = store.find_by_hash(&first.content_hash).await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.questions, questions());
    }

    #[tokio::test]
    async fn test_second_active_attempt_is_unique_violation() {
        let Some(store) = test_store().await else { return };
        let assessment = seed_assessment(&store).await;
        let user = Uuid::new_v4();
        let now = whole_seconds(Utc::now());

        let active = store.insert_active(user, assessment.id, now).await.unwrap();
        let err = store
            .insert_active(user, assessment.id, now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation));

        let found = store.find_active(user, assessment.id).await.unwrap().unwrap();
        assert_eq!(found.id, active.id);
        assert_eq!(found.started_at, now);

        // The index only covers active rows, so a retake is allowed once this one ends.
        assert!(store.expire(active.id).await.unwrap());
        let retake = store.insert_active(user, assessment.id, now).await.unwrap();
        assert_ne!(retake.id, active.id);
    }

    #[tokio::test]
    async fn test_complete_then_expire_is_refused() {
        let Some(store) = test_store().await else { return };
        let assessment = seed_assessment(&store).await;
        let user = Uuid::new_v4();
        let attempt = store
            .insert_active(user, assessment.id, Utc::now())
            .await
            .unwrap();
        let done = outcome(Utc::now());

        assert!(store.complete(attempt.id, &done).await.unwrap());
        assert!(!store.expire(attempt.id).await.unwrap());
        assert!(!store.complete(attempt.id, &outcome(Utc::now())).await.unwrap());

        let stored = store.find_owned(attempt.id, user).await.unwrap().unwrap();
        assert_eq!(stored.status, AttemptStatus::Completed);
        assert_eq!(stored.outcome, Some(done));
        assert!(store
            .find_owned(attempt.id, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_expire_then_complete_is_refused() {
        let Some(store) = test_store().await else { return };
        let assessment = seed_assessment(&store).await;
        let user = Uuid::new_v4();
        let attempt = store
            .insert_active(user, assessment.id, Utc::now())
            .await
            .unwrap();

        assert!(store.expire(attempt.id).await.unwrap());
        assert!(!store.complete(attempt.id, &outcome(Utc::now())).await.unwrap());

        let stored = store.find_owned(attempt.id, user).await.unwrap().unwrap();
        assert_eq!(stored.status, AttemptStatus::Expired);
        assert!(stored.outcome.is_none());
    }

    #[tokio::test]
    async fn test_schema_rejects_completed_row_without_outcome() {
        let Some(store) = test_store().await else { return };
        let assessment = seed_assessment(&store).await;
        let attempt = store
            .insert_active(Uuid::new_v4(), assessment.id, Utc::now())
            .await
            .unwrap();

        let result = sqlx::query("UPDATE attempts SET status = 'completed' WHERE id = $1")
            .bind(attempt.id)
            .execute(&store.pool)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_completed_is_most_recent_first() {
        let Some(store) = test_store().await else { return };
        let user = Uuid::new_v4();
        let t = Utc::now();

        let mut ids = Vec::new();
        for offset in [0, 2, 1] {
            let assessment = seed_assessment(&store).await;
            let attempt = store.insert_active(user, assessment.id, t).await.unwrap();
            let submitted = t + chrono::Duration::hours(offset);
            assert!(store.complete(attempt.id, &outcome(submitted)).await.unwrap());
            ids.push(attempt.id);
        }
        // An attempt still running never shows up.
        let running = seed_assessment(&store).await;
        store.insert_active(user, running.id, t).await.unwrap();

        let listed: Vec<Uuid> = store
            .list_completed(user)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(listed, vec![ids[1], ids[2], ids[0]]);
    }
}
