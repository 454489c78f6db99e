use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImmoError {
    #[error("Invalid configuration: {field} — {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Internal inconsistency: balance sheet off by {imbalance} at month {month}")]
    InternalInconsistency { month: u32, imbalance: Decimal },

    #[error("Metric unavailable: {metric} — {reason}")]
    MetricsUnavailable { metric: String, reason: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ImmoError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ImmoError::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ImmoError {
    fn from(e: serde_json::Error) -> Self {
        ImmoError::SerializationError(e.to_string())
    }
}
