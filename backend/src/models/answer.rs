use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnswerRequest {
    /// Free-text question, e.g. "сколько лайков набрали видео за май 2025"
    pub question: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResponse {
    /// Text to show the user
    pub reply: String,
    /// Numeric answer; absent for command replies such as `/start`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
}

impl AnswerResponse {
    pub fn value(value: i64) -> Self {
        Self { reply: value.to_string(), value: Some(value) }
    }

    pub fn text(reply: impl Into<String>) -> Self {
        Self { reply: reply.into(), value: None }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: bool,
}
