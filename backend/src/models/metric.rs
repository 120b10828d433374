use serde::Serialize;

/// Scalar outcome of one metrics question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricResult {
    pub value: i64,
}

impl MetricResult {
    pub const ZERO: MetricResult = MetricResult { value: 0 };

    pub fn new(value: i64) -> Self {
        Self { value }
    }
}
