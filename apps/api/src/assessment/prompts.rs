// LLM prompt templates for assessment and study-plan generation.

/// Role for question generation. Joined with the shared JSON-only instruction.
pub const ASSESSMENT_SYSTEM: &str = "You are an expert technical interviewer. \
    You write precise multiple-choice questions grounded in a candidate's resume.";

/// Question generation prompt. Replace `{question_count}` and `{resume_text}` before sending.
pub const ASSESSMENT_PROMPT_TEMPLATE: &str = r#"Based on the following resume:

{resume_text}

Generate {question_count} multiple choice technical questions that probe the skills,
tools and systems the candidate claims.

Each question must follow this JSON structure:
{
  "question": "string",
  "options": ["string", "string", "string", "string"],
  "correctAnswer": "string (exactly one of the options)",
  "topic": "string (short skill or area name, reused across related questions)",
  "difficulty": "easy" | "medium" | "hard"
}

RULES:
1. Return ONLY a JSON array of {question_count} such objects.
2. "options" must contain exactly 4 distinct strings.
3. "correctAnswer" must be copied verbatim from "options".
4. Mix difficulties; keep topic names consistent so results can be grouped."#;

/// Role for study-plan generation.
pub const STUDY_PLAN_SYSTEM: &str = "You are an expert coding mentor \
    who turns mock interview results into a focused one-week study plan.";

/// Study-plan prompt. Replace `{topic_performance}` before sending.
pub const STUDY_PLAN_PROMPT_TEMPLATE: &str = r#"Based on this topic performance from a mock interview test:

{topic_performance}

Return a JSON object with EXACTLY this structure:
{
  "weakAreas": ["topic1", "topic2"],
  "studyPlan": [
    { "day": 1, "focus": "Topic Name", "tasks": "What to study" },
    { "day": 2, "focus": "Topic Name", "tasks": "What to study" },
    { "day": 3, "focus": "Topic Name", "tasks": "What to study" },
    { "day": 4, "focus": "Topic Name", "tasks": "What to study" },
    { "day": 5, "focus": "Topic Name", "tasks": "What to study" },
    { "day": 6, "focus": "Topic Name", "tasks": "What to study" },
    { "day": 7, "focus": "Topic Name", "tasks": "What to study" }
  ],
  "recommendations": ["recommendation 1", "recommendation 2", "recommendation 3"]
}

A topic is weak when fewer than 60% of its questions were answered correctly."#;
