use axum::{Json, extract::State};
use std::sync::Arc;

use crate::AppState;
use crate::models::{AnswerRequest, AnswerResponse, HealthResponse};
use crate::services::MetricsService;
use crate::utils::{ApiError, ApiResult};

pub const START_COMMAND: &str = "/start";
pub const GREETING: &str = "Ок. Спросите что-нибудь о статистике видео, например: «Сколько всего лайков?»";

/// Chat-style reply shared by the HTTP and CLI transports.
pub async fn reply(service: &MetricsService, text: &str) -> AnswerResponse {
    let text = text.trim();
    if text == START_COMMAND {
        return AnswerResponse::text(GREETING);
    }
    AnswerResponse::value(service.answer(text).await)
}

// Answer a metrics question
#[utoipa::path(
    post,
    path = "/api/answer",
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Numeric answer, 0 when the question cannot be answered", body = AnswerResponse),
        (status = 400, description = "Empty question")
    ),
    tag = "Metrics"
)]
pub async fn answer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnswerRequest>,
) -> ApiResult<Json<AnswerResponse>> {
    if req.question.trim().is_empty() {
        return Err(ApiError::invalid_input("Question must not be empty"));
    }

    Ok(Json(reply(&state.metrics_service, &req.question).await))
}

// Liveness and store connectivity
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service status", body = HealthResponse)
    ),
    tag = "System"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = state.db.ping().await;
    let status = if database { "ok" } else { "degraded" };
    Json(HealthResponse { status: status.to_string(), database })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::common::{Scripted, count, pipeline};

    #[tokio::test]
    async fn test_start_command_greets_without_translating() {
        let p = pipeline(Scripted::Sql("SELECT 1".into())).await;

        let response = reply(&p.service, "  /start ").await;

        assert_eq!(response.reply, GREETING);
        assert_eq!(response.value, None);
        assert_eq!(count(&p.translator_calls), 0);
    }

    #[tokio::test]
    async fn test_question_replies_with_number() {
        let p = pipeline(Scripted::Sql("SELECT COUNT(*) FROM videos".into())).await;

        let response = reply(&p.service, "сколько видео?").await;

        assert_eq!(response.reply, "3");
        assert_eq!(response.value, Some(3));
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let p = pipeline(Scripted::Sql("SELECT 1".into())).await;
        let state = Arc::new(AppState { metrics_service: p.service, db: p.db });

        let result = answer(State(state), Json(AnswerRequest { question: "   ".into() })).await;

        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_health_reports_database() {
        let p = pipeline(Scripted::Sql("SELECT 1".into())).await;
        let state = Arc::new(AppState { metrics_service: p.service, db: p.db });

        let Json(health) = health(State(state)).await;

        assert_eq!(health.status, "ok");
        assert!(health.database);
    }
}
