//! Video Metrics
//!
//! Answers natural-language questions about video engagement with a single
//! number: an LLM writes the SQL, the sanitizer vets it, the metrics store runs it.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::Config;
use crate::services::llm;
use crate::services::{MetricsDb, MetricsService, QueryExecutor};

pub struct AppState {
    pub metrics_service: MetricsService,
    pub db: MetricsDb,
}

impl AppState {
    /// Connect the store, run migrations if enabled and wire the pipeline.
    pub async fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let db = MetricsDb::connect(&config.database).await?;
        if config.database.run_migrations {
            db.migrate().await?;
        }

        let translator = llm::translator_from_config(&config.llm)?;
        let executor = QueryExecutor::new(Arc::new(db.clone()));
        let metrics_service = MetricsService::new(Arc::new(translator), executor);

        Ok(Self { metrics_service, db })
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handlers::answer::answer, handlers::answer::health),
    components(schemas(
        models::AnswerRequest,
        models::AnswerResponse,
        models::HealthResponse
    )),
    tags(
        (name = "Metrics", description = "Natural-language metrics questions"),
        (name = "System", description = "Service status")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/answer", post(handlers::answer::answer))
        .route("/api/health", get(handlers::answer::health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
