//! Error types for latchkey.
//!
//! Uses thiserror for derive macros. Contention outcomes (`AlreadyLocked`,
//! `AlreadyUnlocked`, `AlreadyExists`, `Conflict`) are ordinary results of
//! condition-guarded writes and are kept apart from infrastructure faults so
//! callers, and the lock retry loop, can tell them apart.

use crate::engine::EngineError;
use crate::exit_codes;
use thiserror::Error;

/// Main error type for latchkey operations.
#[derive(Error, Debug)]
pub enum LatchkeyError {
    /// Invalid arguments, configuration, or mutex name.
    #[error("{0}")]
    UserError(String),

    /// A mutex with this name was already created.
    #[error("mutex '{0}' already exists")]
    AlreadyExists(String),

    /// The mutex is held by someone else.
    #[error("mutex '{0}' is already locked")]
    AlreadyLocked(String),

    /// The mutex is not held.
    #[error("mutex '{0}' is already unlocked")]
    AlreadyUnlocked(String),

    /// No mutex with this name exists.
    #[error("mutex '{0}' not found")]
    NotFound(String),

    /// A concurrent transition moved the mutex between read and write.
    #[error("concurrent update on mutex '{name}': {detail}")]
    Conflict { name: String, detail: String },

    /// The caller cancelled the operation or its deadline passed.
    #[error("operation cancelled")]
    Cancelled,

    /// The backing engine is unreachable or throttling requests.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The backing engine did not answer in time.
    #[error("engine timed out: {0}")]
    Timeout(String),

    /// Table creation failed because a table with the same name is being deleted.
    #[error("table '{0}' deletion in progress")]
    DeleteInProgress(String),

    /// Table creation did not finish within the polling budget.
    #[error("timed out waiting for table '{0}' creation")]
    BootstrapTimedOut(String),

    /// Table provisioning failed for another reason.
    #[error("table bootstrap failed: {0}")]
    BootstrapFailed(String),

    /// Non-transient storage failure (I/O, corrupt data, unexpected engine reply).
    #[error("storage error: {0}")]
    Storage(String),
}

impl LatchkeyError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LatchkeyError::UserError(_) => exit_codes::USER_ERROR,
            LatchkeyError::AlreadyExists(_)
            | LatchkeyError::AlreadyLocked(_)
            | LatchkeyError::AlreadyUnlocked(_)
            | LatchkeyError::Conflict { .. } => exit_codes::CONTENTION,
            LatchkeyError::NotFound(_) => exit_codes::NOT_FOUND,
            LatchkeyError::Cancelled => exit_codes::CANCELLED,
            LatchkeyError::EngineUnavailable(_)
            | LatchkeyError::Timeout(_)
            | LatchkeyError::DeleteInProgress(_)
            | LatchkeyError::BootstrapTimedOut(_)
            | LatchkeyError::BootstrapFailed(_)
            | LatchkeyError::Storage(_) => exit_codes::ENGINE_FAILURE,
        }
    }

    /// Whether another lock attempt could succeed without outside intervention.
    ///
    /// Contention and transient engine faults are retryable; a missing mutex,
    /// bad input, or corrupt storage is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LatchkeyError::AlreadyLocked(_)
                | LatchkeyError::Conflict { .. }
                | LatchkeyError::EngineUnavailable(_)
                | LatchkeyError::Timeout(_)
        )
    }
}

impl From<EngineError> for LatchkeyError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unavailable(msg) => LatchkeyError::EngineUnavailable(msg),
            EngineError::Throttled(msg) => {
                LatchkeyError::EngineUnavailable(format!("throttled: {}", msg))
            }
            EngineError::TimedOut(msg) => LatchkeyError::Timeout(msg),
            other => LatchkeyError::Storage(other.to_string()),
        }
    }
}

/// Result type alias for latchkey operations.
pub type Result<T> = std::result::Result<T, LatchkeyError>;
