//! Background expiry sweep.
//!
//! Every tick, each `in_progress` attempt whose deadline
//! (`started_at + duration + grace`) has passed is flipped to `expired`. The
//! flip is the same guarded write `submit` races against, so a submission that
//! commits first is never overwritten.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use uuid::Uuid;

use crate::store::{AssessmentStore, AttemptStore, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub expired: usize,
    /// Attempts that could not be evaluated this pass; retried next tick.
    pub failed: usize,
}

/// One pass over every active attempt. Only the initial listing is fatal; a
/// failure on a single attempt is logged and counted.
pub async fn sweep_once(
    assessments: &dyn AssessmentStore,
    attempts: &dyn AttemptStore,
    grace: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<SweepReport, StoreError> {
    let active = attempts.list_in_progress().await?;
    let mut report = SweepReport {
        examined: active.len(),
        ..SweepReport::default()
    };
    let mut durations: HashMap<Uuid, Option<i32>> = HashMap::new();

    for attempt in active {
        let duration = match durations.get(&attempt.assessment_id) {
            Some(cached) => *cached,
            None => match assessments.find(attempt.assessment_id).await {
                Ok(found) => {
                    let minutes = found.map(|a| a.duration_minutes);
                    durations.insert(attempt.assessment_id, minutes);
                    minutes
                }
                Err(e) => {
                    tracing::error!(
                        "Sweep could not load assessment {} for attempt {}: {e}",
                        attempt.assessment_id,
                        attempt.id
                    );
                    report.failed += 1;
                    continue;
                }
            },
        };

        let Some(duration_minutes) = duration else {
            tracing::warn!(
                "Attempt {} references missing assessment {}, skipping",
                attempt.id,
                attempt.assessment_id
            );
            report.failed += 1;
            continue;
        };

        if now <= attempt.deadline(duration_minutes, grace) {
            continue;
        }

        match attempts.expire(attempt.id).await {
            Ok(true) => {
                tracing::info!(
                    "Expired attempt {} (user {}, started {})",
                    attempt.id,
                    attempt.user_id,
                    attempt.started_at
                );
                report.expired += 1;
            }
            // Submitted between the listing and now.
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Failed to expire attempt {}: {e}", attempt.id);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Handle for the periodic sweep task.
pub struct SweepHandle {
    shutdown_tx: broadcast::Sender<()>,
    task_handle: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Spawns the sweep loop. The first pass runs immediately.
    pub fn spawn(
        assessments: Arc<dyn AssessmentStore>,
        attempts: Arc<dyn AttemptStore>,
        grace: chrono::Duration,
        every: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task_handle = tokio::spawn(run_sweep_loop(
            assessments,
            attempts,
            grace,
            every,
            shutdown_rx,
        ));

        Self {
            shutdown_tx,
            task_handle: Some(task_handle),
        }
    }

    /// Signals the loop and waits for an in-flight pass to finish.
    pub async fn stop(&mut self) -> anyhow::Result<()> {
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| anyhow::anyhow!("Failed to stop expiry sweep: {e}"))?;
        }

        tracing::info!("Expiry sweep stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

async fn run_sweep_loop(
    assessments: Arc<dyn AssessmentStore>,
    attempts: Arc<dyn AttemptStore>,
    grace: chrono::Duration,
    every: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut timer = interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!("Starting expiry sweep every {}s", every.as_secs());

    loop {
        tokio::select! {
            _ = timer.tick() => {
                match sweep_once(assessments.as_ref(), attempts.as_ref(), grace, Utc::now()).await {
                    Ok(report) if report.expired > 0 || report.failed > 0 => {
                        tracing::info!(
                            "Sweep examined {} attempt(s): {} expired, {} failed",
                            report.examined,
                            report.expired,
                            report.failed
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!("Expiry sweep failed: {e}"),
                }
            }

            _ = shutdown_rx.recv() => {
                tracing::info!("Expiry sweep received shutdown signal");
                break;
            }
        }
    }
}
