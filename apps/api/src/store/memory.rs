//! In-memory store for tests. Each method runs under one lock, so it honours the
//! same uniqueness and status guards as the Postgres schema.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::assessment::Assessment;
use crate::models::attempt::{Attempt, AttemptStatus, Outcome};
use crate::store::{AssessmentStore, AttemptStore, NewAssessment, StoreError};

#[derive(Default)]
struct Tables {
    assessments: HashMap<Uuid, Assessment>,
    attempts: HashMap<Uuid, Attempt>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assessment_count(&self) -> usize {
        self.tables.lock().unwrap().assessments.len()
    }

    pub fn attempt(&self, id: Uuid) -> Option<Attempt> {
        self.tables.lock().unwrap().attempts.get(&id).cloned()
    }

    pub fn attempts_for(&self, user_id: Uuid) -> Vec<Attempt> {
        self.tables
            .lock()
            .unwrap()
            .attempts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Drops an assessment row, leaving its attempts dangling.
    pub fn remove_assessment(&self, id: Uuid) {
        self.tables.lock().unwrap().assessments.remove(&id);
    }
}

#[async_trait]
impl AssessmentStore for InMemoryStore {
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<Assessment>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .assessments
            .values()
            .find(|a| a.content_hash == content_hash)
            .cloned())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Assessment>, StoreError> {
        Ok(self.tables.lock().unwrap().assessments.get(&id).cloned())
    }

    async fn insert(&self, new: NewAssessment<'_>) -> Result<Assessment, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .assessments
            .values()
            .any(|a| a.content_hash == new.content_hash)
        {
            return Err(StoreError::UniqueViolation);
        }
        let assessment = Assessment {
            id: Uuid::new_v4(),
            content_hash: new.content_hash.to_string(),
            questions: new.questions.to_vec(),
            duration_minutes: new.duration_minutes,
            created_at: Utc::now(),
        };
        tables.assessments.insert(assessment.id, assessment.clone());
        Ok(assessment)
    }
}

#[async_trait]
impl AttemptStore for InMemoryStore {
    async fn find_active(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
    ) -> Result<Option<Attempt>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .attempts
            .values()
            .find(|a| {
                a.user_id == user_id
                    && a.assessment_id == assessment_id
                    && a.status == AttemptStatus::InProgress
            })
            .cloned())
    }

    async fn insert_active(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<Attempt, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let taken = tables.attempts.values().any(|a| {
            a.user_id == user_id
                && a.assessment_id == assessment_id
                && a.status == AttemptStatus::InProgress
        });
        if taken {
            return Err(StoreError::UniqueViolation);
        }
        let attempt = Attempt {
            id: Uuid::new_v4(),
            user_id,
            assessment_id,
            status: AttemptStatus::InProgress,
            started_at,
            outcome: None,
            created_at: Utc::now(),
        };
        tables.attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> Result<Option<Attempt>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .attempts
            .get(&id)
            .filter(|a| a.user_id == user_id)
            .cloned())
    }

    async fn complete(&self, id: Uuid, outcome: &Outcome) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.attempts.get_mut(&id) {
            Some(attempt) if attempt.status == AttemptStatus::InProgress => {
                attempt.status = AttemptStatus::Completed;
                attempt.outcome = Some(outcome.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.attempts.get_mut(&id) {
            Some(attempt) if attempt.status == AttemptStatus::InProgress => {
                attempt.status = AttemptStatus::Expired;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_in_progress(&self) -> Result<Vec<Attempt>, StoreError> {
        let tables = self.tables.lock().unwrap();
        let mut active: Vec<Attempt> = tables
            .attempts
            .values()
            .filter(|a| a.status == AttemptStatus::InProgress)
            .cloned()
            .collect();
        active.sort_by_key(|a| a.started_at);
        Ok(active)
    }

    async fn list_completed(&self, user_id: Uuid) -> Result<Vec<Attempt>, StoreError> {
        let tables = self.tables.lock().unwrap();
        let mut done: Vec<Attempt> = tables
            .attempts
            .values()
            .filter(|a| a.user_id == user_id && a.status == AttemptStatus::Completed)
            .cloned()
            .collect();
        done.sort_by_key(|a| {
            std::cmp::Reverse(a.outcome.as_ref().map(|o| o.submitted_at))
        });
        Ok(done)
    }
}
