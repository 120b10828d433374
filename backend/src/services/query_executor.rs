use std::sync::Arc;

use crate::models::MetricResult;
use crate::services::metric_store::MetricStore;
use crate::services::sql_sanitizer::SanitizedQuery;
use crate::utils::ExecutionError;

/// Runs sanitized statements and coerces their scalar to an integer.
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn MetricStore>,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }

    /// Fallible form used by the pipeline.
    pub async fn fetch(&self, query: &SanitizedQuery) -> Result<MetricResult, ExecutionError> {
        tracing::debug!("Executing metric query: {}", query);
        let scalar = self.store.fetch_scalar(query).await?;
        scalar.to_metric()
    }

    /// Never fails: database and coercion errors become zero.
    pub async fn execute(&self, query: &SanitizedQuery) -> MetricResult {
        match self.fetch(query).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Metric query failed, answering 0: {}", e);
                MetricResult::ZERO
            },
        }
    }
}
