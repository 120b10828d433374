use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Pipeline errors
// ============================================================================

/// Credential exchange with the LLM provider failed.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Token endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed token response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Token response carried no access_token")]
    MissingToken,

    #[error("Token expiry out of range: {0}")]
    InvalidExpiry(String),
}

/// LLM completion call failed or returned something unusable.
#[derive(Error, Debug)]
pub enum TranslationError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed completion response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Completion response has no choices[0].message.content")]
    MissingContent,
}

/// The sanitizer refused to let a generated statement reach the database.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectedQuery {
    #[error("Empty statement")]
    Empty,

    #[error("Statement does not start with SELECT: {prefix}")]
    NotSelect { prefix: String },

    #[error("Forbidden keyword in statement: {keyword}")]
    ForbiddenKeyword { keyword: String },
}

/// Running the statement or coercing its scalar failed.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Result is not an integer: {0}")]
    NotCoercible(String),
}

/// Umbrella error threaded through the question pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Rejected(#[from] RejectedQuery),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl From<AuthError> for PipelineError {
    fn from(err: AuthError) -> Self {
        Self::Translation(TranslationError::Auth(err))
    }
}

impl PipelineError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Translation(TranslationError::Auth(_)) => "auth",
            Self::Translation(_) => "translation",
            Self::Rejected(_) => "rejected_query",
            Self::Execution(_) => "execution",
        }
    }
}

// ============================================================================
// HTTP surface
// ============================================================================

/// Errors returned by the HTTP handlers.
///
/// The pipeline itself never fails outward: a question that cannot be answered
/// is answered with 0. Only malformed requests are refused.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn error_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_) => 4002,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub code: i32,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.error_code();
        let message = match self {
            Self::InvalidInput(msg) => msg,
        };

        (status, Json(ApiErrorResponse { code, message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
