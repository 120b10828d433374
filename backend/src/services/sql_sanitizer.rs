//! SQL Sanitizer
//!
//! Gate between raw model output and the database driver. It does not parse
//! SQL; it strips formatting, keeps the first statement and rejects anything
//! that is not plainly a single `SELECT`. When in doubt it rejects.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::RejectedQuery;

/// Opening fence with an optional language hint, e.g. "```sql\n" or "```postgresql ".
static OPENING_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^```[ \t]*(?:(?P<hint>[A-Za-z0-9_+-]*)[ \t]*\r?\n|(?i:sql|postgresql|postgres|pgsql)\b)?",
    )
    .expect("valid fence regex")
});

/// Words that never belong in a read-only metrics query.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "create", "truncate", "grant", "revoke",
    "copy", "into", "merge", "call", "execute", "vacuum", "reindex", "comment", "lock",
    "listen", "notify", "attach", "detach", "pragma",
];

static FORBIDDEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({})\b", FORBIDDEN_KEYWORDS.join("|")))
        .expect("valid keyword regex")
});

/// A statement that passed [`sanitize`]. Only this module can build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedQuery(String);

impl SanitizedQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SanitizedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize raw model output into one statement and validate it.
pub fn sanitize(raw: &str) -> Result<SanitizedQuery, RejectedQuery> {
    let statement = first_statement(raw);
    validate(statement)?;
    Ok(SanitizedQuery(statement.to_string()))
}

/// Formatting cleanup only: fences, first statement, whitespace.
pub fn first_statement(raw: &str) -> &str {
    let text = strip_opening_fence(raw.trim());
    // Closing fence ends the statement; whatever follows is commentary
    let text = text.split("```").next().unwrap_or_default();
    let text = text.split(';').next().unwrap_or_default();
    text.trim()
}

fn strip_opening_fence(text: &str) -> &str {
    let Some(caps) = OPENING_FENCE.captures(text) else {
        return text;
    };
    match caps.name("hint") {
        // "```SELECT\n..." is a statement broken after its keyword, not a language tag
        Some(hint) if hint.as_str().eq_ignore_ascii_case("select") => &text[hint.start()..],
        _ => caps.get(0).map_or(text, |fence| &text[fence.end()..]),
    }
}

fn validate(statement: &str) -> Result<(), RejectedQuery> {
    if statement.is_empty() {
        return Err(RejectedQuery::Empty);
    }

    let starts_with_select =
        statement.get(..6).is_some_and(|head| head.eq_ignore_ascii_case("select"));
    if !starts_with_select {
        let prefix = statement.chars().take(20).collect::<String>();
        return Err(RejectedQuery::NotSelect { prefix });
    }

    if let Some(found) = FORBIDDEN.find(statement) {
        return Err(RejectedQuery::ForbiddenKeyword { keyword: found.as_str().to_lowercase() });
    }

    Ok(())
}
