//! Study-plan generation with a guaranteed local fallback.
//!
//! `generate_study_plan` never fails. The model gets exactly one call under a
//! timeout; an outage, a timeout or unusable output all yield the deterministic
//! fallback plan built from the topic stats.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::assessment::prompts::{STUDY_PLAN_PROMPT_TEMPLATE, STUDY_PLAN_SYSTEM};
use crate::llm_client::extract::{extract_json, Extracted, Literal};
use crate::llm_client::prompts::json_only;
use crate::llm_client::{CallOptions, CompletionModel};
use crate::models::attempt::{StudyDay, StudyPlan, TopicStats};

/// Topics answered correctly less often than this are weak.
pub const WEAK_ACCURACY_THRESHOLD: f64 = 0.6;
/// Length of a study plan in days.
pub const PLAN_DAYS: usize = 7;

const FALLBACK_RECOMMENDATIONS: [&str; 3] = [
    "Focus on your weak areas identified above",
    "Practice coding problems daily on LeetCode or HackerRank",
    "Review core concepts before attempting another mock test",
];

#[derive(Debug, Deserialize)]
struct RawStudyPlan {
    #[serde(alias = "weakAreas")]
    weak_areas: Option<Vec<String>>,
    #[serde(alias = "studyPlan")]
    study_plan: Option<Vec<StudyDay>>,
    recommendations: Option<Vec<String>>,
}

/// Topics with accuracy below `WEAK_ACCURACY_THRESHOLD`, in topic order.
pub fn weak_areas(topic_stats: &TopicStats) -> Vec<String> {
    topic_stats
        .iter()
        .filter(|(_, stat)| stat.accuracy() < WEAK_ACCURACY_THRESHOLD)
        .map(|(topic, _)| topic.clone())
        .collect()
}

/// The plan used whenever the model cannot produce one.
pub fn fallback_plan(topic_stats: &TopicStats) -> StudyPlan {
    let weak = weak_areas(topic_stats);
    let study_plan = weak
        .iter()
        .take(PLAN_DAYS)
        .enumerate()
        .map(|(i, topic)| StudyDay {
            day: i as u32 + 1,
            focus: topic.clone(),
            tasks: format!("Review {topic} fundamentals and practice problems"),
        })
        .collect();

    StudyPlan {
        weak_areas: weak,
        study_plan,
        recommendations: FALLBACK_RECOMMENDATIONS
            .iter()
            .map(|r| r.to_string())
            .collect(),
    }
}

fn format_topic_performance(topic_stats: &TopicStats) -> String {
    topic_stats
        .iter()
        .map(|(topic, stat)| {
            format!(
                "{topic}: {:.0}% ({}/{})",
                stat.accuracy() * 100.0,
                stat.correct,
                stat.total
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reads a plan out of model output. Every field is required.
///
/// Objects are preferred over arrays here: the plan itself is an object whose
/// `weakAreas` array would otherwise be the first literal matched.
pub fn parse_study_plan(text: &str) -> Result<StudyPlan, String> {
    let map = match extract_json(text, Literal::Object) {
        Extracted::Object(map) => map,
        Extracted::Array(_) => return Err("expected an object, found an array".to_string()),
        Extracted::Nothing => return Err("no JSON found in output".to_string()),
    };

    let raw: RawStudyPlan =
        serde_json::from_value(serde_json::Value::Object(map)).map_err(|e| e.to_string())?;

    let weak_areas = raw.weak_areas.ok_or("missing weakAreas")?;
    let study_plan = raw.study_plan.ok_or("missing studyPlan")?;
    let recommendations = raw.recommendations.ok_or("missing recommendations")?;
    if study_plan.len() > PLAN_DAYS {
        return Err(format!("plan has {} days", study_plan.len()));
    }

    Ok(StudyPlan {
        weak_areas,
        study_plan,
        recommendations,
    })
}

/// Asks the model for a plan; never fails outward. Latency is bounded by `timeout`.
pub async fn generate_study_plan(
    llm: &dyn CompletionModel,
    topic_stats: &TopicStats,
    timeout: Duration,
) -> StudyPlan {
    let prompt =
        STUDY_PLAN_PROMPT_TEMPLATE.replace("{topic_performance}", &format_topic_performance(topic_stats));
    let system = json_only(STUDY_PLAN_SYSTEM);

    let call = llm.complete(&prompt, &system, CallOptions::single(timeout));
    let output = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!("Study plan generation failed, using fallback: {e}");
            return fallback_plan(topic_stats);
        }
        Err(_) => {
            warn!("Study plan generation timed out after {timeout:?}, using fallback");
            return fallback_plan(topic_stats);
        }
    };

    match parse_study_plan(&output) {
        Ok(plan) => {
            debug!("Study plan generated with {} days", plan.study_plan.len());
            plan
        }
        Err(reason) => {
            warn!("Study plan output rejected ({reason}), using fallback");
            fallback_plan(topic_stats)
        }
    }
}
