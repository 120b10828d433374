//! Scalar access to the metrics store

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::models::MetricResult;
use crate::services::sql_sanitizer::SanitizedQuery;
use crate::utils::ExecutionError;

/// First column of the first row, as returned by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// SQL NULL, or no row at all
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    /// Integer view of the scalar. Fractions truncate toward zero; NULL is zero.
    pub fn to_metric(&self) -> Result<MetricResult, ExecutionError> {
        let value = match self {
            Self::Null => 0,
            Self::Bool(b) => i64::from(*b),
            Self::Int(n) => *n,
            Self::Decimal(d) => d
                .trunc()
                .to_i64()
                .ok_or_else(|| ExecutionError::NotCoercible(d.to_string()))?,
            Self::Float(f) => {
                if !f.is_finite() || *f >= i64::MAX as f64 || *f <= i64::MIN as f64 {
                    return Err(ExecutionError::NotCoercible(f.to_string()));
                }
                f.trunc() as i64
            },
            Self::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| ExecutionError::NotCoercible(s.clone()))?,
        };
        Ok(MetricResult::new(value))
    }
}

/// Read-only scalar query execution.
#[async_trait]
pub trait MetricStore: Send + Sync {
    async fn fetch_scalar(&self, query: &SanitizedQuery) -> Result<ScalarValue, ExecutionError>;
}
