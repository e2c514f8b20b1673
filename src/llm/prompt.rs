//! Prompt construction for LLM requests.
//!
//! The generation prompt is grounded in the schema and a fixed set of rules
//! for the single `employees` table. The summary prompt carries only the
//! question and the raw result.

use crate::llm::types::{prompt_messages, Message};

/// Grounding template for SQL generation.
const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a PostgreSQL expert.

[DATABASE SCHEMA]
{schema}

[KEY RULES]
1. **Single Table Strategy:** All data is in the 'employees' table.
2. **No Joins:** Do not use JOIN. Do not look for 'departments' or 'projects' tables.
3. **Columns:**
   - Use 'manager_name' to find managers (e.g. WHERE manager_name = 'Alice Wright').
   - Use 'location' for city/remote queries.
   - Use 'performance_score' (1-10) for performance.
4. **Output:** Return ONLY raw SQL. No Markdown."#;

/// Marker used when there is no prior conversation.
pub const EMPTY_HISTORY: &str = "None";

/// Inputs for the generation prompt.
#[derive(Debug, Clone, Copy)]
pub struct GenerationPrompt<'a> {
    pub schema: &'a str,
    pub history: &'a [String],
    pub history_window: usize,
    pub question: &'a str,
    /// Error from the previous attempt, quoted back for self-correction.
    pub previous_error: Option<&'a str>,
}

/// Builds the grounding block with the schema injected.
pub fn build_system_prompt(schema: &str) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{schema}", schema)
}

/// Joins the trailing `window` history entries, or returns the "none" marker.
pub fn history_context(history: &[String], window: usize) -> String {
    let start = history.len().saturating_sub(window);
    let recent = &history[start..];
    if recent.is_empty() {
        EMPTY_HISTORY.to_string()
    } else {
        recent.join("\n")
    }
}

/// Builds the user block: history, question, and the correction request.
pub fn build_user_prompt(prompt: &GenerationPrompt<'_>) -> String {
    let mut text = format!(
        "[HISTORY]\n{}\n\n[QUESTION]\n{}",
        history_context(prompt.history, prompt.history_window),
        prompt.question
    );

    if let Some(error) = prompt.previous_error {
        text.push_str(&format!("\n\n[PREVIOUS ERROR] {error}\nFix the SQL."));
    }

    text
}

/// Builds the two-message request for SQL generation.
pub fn build_generation_messages(prompt: &GenerationPrompt<'_>) -> Vec<Message> {
    prompt_messages(
        Some(build_system_prompt(prompt.schema)),
        build_user_prompt(prompt),
    )
}

/// Builds the single-message request that turns rows into an answer.
pub fn build_summary_messages(question: &str, result: &str) -> Vec<Message> {
    let prompt = format!(
        "User Query: \"{question}\"\nSQL Result: {result}\n\nTask: Answer the user briefly based on the result."
    );
    prompt_messages(None, prompt)
}
