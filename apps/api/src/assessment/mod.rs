// Resume intake: text extraction, content hashing, the assessment cache and
// question generation. Model calls go through llm_client only.

pub mod cache;
pub mod generator;
pub mod handlers;
pub mod hasher;
pub mod intake;
pub mod prompts;
pub mod resume_text;
pub mod study_plan;
