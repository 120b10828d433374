//! Text-to-SQL system prompt

use chrono::{Local, NaiveDate};

const PROMPT: &str = include_str!("text_to_sql_prompt.md");
const DATE_PLACEHOLDER: &str = "{current_date}";

/// Render the system prompt for the given calendar day.
pub fn build_system_prompt(today: NaiveDate) -> String {
    PROMPT
        .replace(DATE_PLACEHOLDER, &today.format("%Y-%m-%d").to_string())
        .trim()
        .to_string()
}

/// System prompt for today's local date.
pub fn system_prompt() -> String {
    build_system_prompt(Local::now().date_naive())
}
