//! Assessment generation: asks the model for questions and accepts only a
//! fully well-formed batch.
//!
//! There is no local fallback here: an assessment cannot be synthesized without
//! the model, so every failure surfaces to the uploader as a `GenerationError`.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::assessment::prompts::{ASSESSMENT_PROMPT_TEMPLATE, ASSESSMENT_SYSTEM};
use crate::llm_client::extract::{extract_json, Extracted, Literal};
use crate::llm_client::prompts::json_only;
use crate::llm_client::{CallOptions, CompletionModel};
use crate::models::assessment::{Difficulty, Question, OPTIONS_PER_QUESTION};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("language model unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("language model output has the wrong shape: {0}")]
    InvalidShape(String),

    #[error("language model returned no questions")]
    Empty,
}

/// Result of scraping questions out of raw model text.
#[derive(Debug, PartialEq)]
pub enum ParseOutcome {
    Questions(Vec<Question>),
    Shape(String),
    Empty,
}

impl ParseOutcome {
    pub fn into_result(self) -> Result<Vec<Question>, GenerationError> {
        match self {
            ParseOutcome::Questions(questions) => Ok(questions),
            ParseOutcome::Shape(reason) => Err(GenerationError::InvalidShape(reason)),
            ParseOutcome::Empty => Err(GenerationError::Empty),
        }
    }
}

/// Shape the model is asked for. Every field is optional here so that a
/// missing field is reported by `validate` instead of a serde message.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(alias = "question")]
    text: Option<String>,
    options: Option<Vec<String>>,
    #[serde(alias = "correctAnswer", alias = "correct_answer", alias = "correctOption")]
    correct_option: Option<String>,
    topic: Option<String>,
    difficulty: Option<String>,
}

impl RawQuestion {
    fn validate(self) -> Result<Question, String> {
        let text = non_blank(self.text).ok_or("missing question text")?;
        let options = self.options.ok_or("missing options")?;
        if options.len() != OPTIONS_PER_QUESTION {
            return Err(format!(
                "expected {OPTIONS_PER_QUESTION} options, got {}",
                options.len()
            ));
        }
        if options.iter().any(|o| o.trim().is_empty()) {
            return Err("blank option".to_string());
        }
        let correct_option = non_blank(self.correct_option).ok_or("missing correct answer")?;
        let topic = non_blank(self.topic).ok_or("missing topic")?;
        let raw_difficulty = self.difficulty.ok_or("missing difficulty")?;
        let difficulty = Difficulty::parse(&raw_difficulty)
            .ok_or_else(|| format!("unknown difficulty '{raw_difficulty}'"))?;

        Ok(Question {
            text,
            options,
            correct_option,
            topic: topic.trim().to_string(),
            difficulty,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Scrapes a question list from free-form model output.
///
/// The first well-formed array wins; failing that, the first object, unwrapped
/// through its `questions` field when it has one. One malformed question rejects
/// the whole batch.
pub fn parse_questions(text: &str) -> ParseOutcome {
    let items = match extract_json(text, Literal::Array) {
        Extracted::Array(items) => items,
        Extracted::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => items,
            Some(_) => return ParseOutcome::Shape("'questions' is not an array".to_string()),
            None => return ParseOutcome::Shape("object without a 'questions' array".to_string()),
        },
        Extracted::Nothing => return ParseOutcome::Shape("no JSON found in output".to_string()),
    };

    if items.is_empty() {
        return ParseOutcome::Empty;
    }

    let mut questions = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let parsed = serde_json::from_value::<RawQuestion>(item)
            .map_err(|e| e.to_string())
            .and_then(RawQuestion::validate);
        match parsed {
            Ok(question) => questions.push(question),
            Err(reason) => return ParseOutcome::Shape(format!("question {index}: {reason}")),
        }
    }

    ParseOutcome::Questions(questions)
}

/// Gate applied before anything is cached: non-empty, and every question well-formed.
pub fn validate_questions(questions: &[Question]) -> Result<(), GenerationError> {
    if questions.is_empty() {
        return Err(GenerationError::Empty);
    }
    for (index, q) in questions.iter().enumerate() {
        let well_formed = !q.text.trim().is_empty()
            && q.options.len() == OPTIONS_PER_QUESTION
            && !q.correct_option.trim().is_empty()
            && !q.topic.trim().is_empty();
        if !well_formed {
            return Err(GenerationError::InvalidShape(format!(
                "question {index} is malformed"
            )));
        }
    }
    Ok(())
}

/// Requests `question_count` questions for a resume. Retries transient upstream
/// failures inside the client; shape problems are not retried.
pub async fn generate_assessment(
    llm: &dyn CompletionModel,
    resume_text: &str,
    question_count: usize,
) -> Result<Vec<Question>, GenerationError> {
    let prompt = ASSESSMENT_PROMPT_TEMPLATE
        .replace("{question_count}", &question_count.to_string())
        .replace("{resume_text}", resume_text);
    let system = json_only(ASSESSMENT_SYSTEM);

    let output = llm
        .complete(&prompt, &system, CallOptions::with_retries())
        .await
        .map_err(|e| GenerationError::UpstreamUnavailable(e.to_string()))?;

    let questions = parse_questions(&output).into_result().map_err(|e| {
        warn!("Rejected generated assessment: {e}");
        e
    })?;

    if questions.len() != question_count {
        warn!(
            "Model returned {} questions, {} requested",
            questions.len(),
            question_count
        );
    }
    info!("Generated {} questions", questions.len());

    Ok(questions)
}
