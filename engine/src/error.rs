//! Engine error taxonomy

use thiserror::Error;

/// Errors surfaced by the trade lifecycle engine.
///
/// Only `Config` is fatal, and only at startup. Everything else is scoped to
/// a single operation of a single cycle.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Order book or kline fetch failed (network, timeout, rate limit).
    #[error("Transient network error during {operation}: {message}")]
    TransientNetwork { operation: String, message: String },

    /// A strategy filter or condition failed to evaluate.
    #[error("Predicate '{label}' of strategy '{strategy}' failed: {message}")]
    PredicateEvaluation {
        strategy: String,
        label: String,
        message: String,
    },

    /// Ledger state does not allow the requested transition.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Position store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed payload from the exchange.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl EngineError {
    pub fn transient(operation: impl Into<String>, message: impl ToString) -> Self {
        EngineError::TransientNetwork {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Failures that should be retried on the next cycle rather than reported.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::TransientNetwork { .. })
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        let operation = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| "request".to_string());
        EngineError::transient(operation, err)
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Parse(err.to_string())
    }
}
