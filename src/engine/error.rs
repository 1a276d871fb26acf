//! Errors reported by a backing engine.

use super::types::CancellationReason;
use thiserror::Error;

/// Error type for backing engine operations.
///
/// The variants mirror what a transactional document store reports on the
/// wire. Callers above the engine map them into `LatchkeyError`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The table (or item container) does not exist or is not active yet.
    #[error("requested resource not found: {0}")]
    ResourceNotFound(String),

    /// The table already exists.
    #[error("resource in use: {0}")]
    ResourceInUse(String),

    /// A single-item conditional write was rejected.
    #[error("the conditional request failed")]
    ConditionalCheckFailed,

    /// A transactional write was rejected; one reason per item, in order.
    #[error("transaction cancelled, reasons [{}]", format_reasons(.reasons))]
    TransactionCanceled { reasons: Vec<CancellationReason> },

    /// The request itself is malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The engine could not be reached.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The engine is busy; retrying later may succeed.
    #[error("request throttled: {0}")]
    Throttled(String),

    /// The engine did not respond in time.
    #[error("request timed out: {0}")]
    TimedOut(String),

    /// Local I/O failure inside the engine.
    #[error("I/O error: {0}")]
    Io(String),

    /// Persisted data could not be decoded.
    #[error("corrupt data: {0}")]
    Corrupt(String),
}

impl EngineError {
    /// Whether item `index` of a cancelled transaction failed its condition.
    pub fn condition_failed_at(&self, index: usize) -> bool {
        match self {
            EngineError::TransactionCanceled { reasons } => {
                matches!(
                    reasons.get(index),
                    Some(CancellationReason::ConditionalCheckFailed)
                )
            }
            _ => false,
        }
    }
}

fn format_reasons(reasons: &[CancellationReason]) -> String {
    reasons
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
