//! Question answering pipeline
//!
//! translate → sanitize → execute. Every failure along the way is answered
//! with `0` so the caller can always render a number.

use std::sync::Arc;

use crate::services::llm::SqlTranslator;
use crate::services::query_executor::QueryExecutor;
use crate::services::sql_sanitizer;
use crate::utils::PipelineError;

#[derive(Clone)]
pub struct MetricsService {
    translator: Arc<dyn SqlTranslator>,
    executor: QueryExecutor,
}

impl MetricsService {
    pub fn new(translator: Arc<dyn SqlTranslator>, executor: QueryExecutor) -> Self {
        Self { translator, executor }
    }

    /// Answer a question; operational failures yield `0`.
    pub async fn answer(&self, question: &str) -> i64 {
        match self.try_answer(question).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(kind = e.kind(), "Answering 0 for {:?}: {}", question, e);
                0
            },
        }
    }

    pub async fn try_answer(&self, question: &str) -> Result<i64, PipelineError> {
        let raw = self.translator.translate(question).await?;
        let query = sql_sanitizer::sanitize(&raw)?;
        let result = self.executor.fetch(&query).await?;
        tracing::info!("Answered {:?} with {}", question, result.value);
        Ok(result.value)
    }
}
