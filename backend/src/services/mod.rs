pub mod data_loader;
pub mod llm;
pub mod metric_store;
pub mod metrics_db;
pub mod metrics_service;
pub mod query_executor;
pub mod sql_sanitizer;

pub use data_loader::{LoadSummary, load_dataset, read_dataset};
pub use metric_store::{MetricStore, ScalarValue};
pub use metrics_db::MetricsDb;
pub use metrics_service::MetricsService;
pub use query_executor::QueryExecutor;
pub use sql_sanitizer::{SanitizedQuery, sanitize};
