// Shared prompt fragments. Each pipeline keeps its own prompts.rs alongside it
// and appends these where it needs them.

/// Appended to every system prompt that expects machine-readable output.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Joins a role description with the JSON-only instruction.
pub fn json_only(system: &str) -> String {
    format!("{system} {JSON_ONLY_INSTRUCTION}")
}
