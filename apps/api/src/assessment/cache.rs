//! Content-addressed assessment cache: at most one assessment per resume hash.

use std::future::Future;

use tracing::{info, warn};

use crate::assessment::generator::{validate_questions, GenerationError};
use crate::assessment::hasher::ContentKey;
use crate::errors::AppError;
use crate::models::assessment::{Assessment, Question};
use crate::store::{AssessmentStore, NewAssessment, StoreError};

#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub assessment: Assessment,
    /// `true` when the assessment already existed and the factory was not called.
    pub cached: bool,
}

/// Returns the assessment for `key`, generating it with `factory` on a miss.
///
/// A factory failure or a batch that fails validation persists nothing. If a
/// concurrent request stored the same key first, its row is returned instead.
pub async fn get_or_create<F, Fut>(
    store: &dyn AssessmentStore,
    key: &ContentKey,
    duration_minutes: i32,
    factory: F,
) -> Result<CacheLookup, AppError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<Question>, GenerationError>>,
{
    if let Some(assessment) = store.find_by_hash(key.as_str()).await? {
        info!("Assessment cache hit for {key}");
        return Ok(CacheLookup {
            assessment,
            cached: true,
        });
    }

    let questions = factory().await?;
    validate_questions(&questions)?;

    let inserted = store
        .insert(NewAssessment {
            content_hash: key.as_str(),
            questions: &questions,
            duration_minutes,
        })
        .await;

    match inserted {
        Ok(assessment) => {
            info!(
                "Stored assessment {} ({} questions) for {key}",
                assessment.id,
                assessment.question_count()
            );
            Ok(CacheLookup {
                assessment,
                cached: false,
            })
        }
        Err(StoreError::UniqueViolation) => {
            warn!("Lost assessment insert race for {key}, reading winner");
            let assessment = store.find_by_hash(key.as_str()).await?.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "assessment for {key} conflicted on insert but cannot be read"
                ))
            })?;
            Ok(CacheLookup {
                assessment,
                cached: true,
            })
        }
        Err(e) => Err(e.into()),
    }
}
