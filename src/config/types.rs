//! Supporting types and default values for the config model.

use serde::{Deserialize, Serialize};

/// Verbosity used when `RUST_LOG` is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter())
    }
}

// ============================================================================
// Default value functions for serde
// ============================================================================

pub(crate) fn default_data_dir() -> String {
    ".latchkey/data".to_string()
}
pub(crate) fn default_table_name() -> String {
    "latchkey".to_string()
}
pub(crate) fn default_lock_retry_delays_secs() -> Vec<u64> {
    crate::mutex::DEFAULT_RETRY_DELAYS_SECS.to_vec()
}
pub(crate) fn default_event_retention_days() -> u32 {
    crate::events::DEFAULT_RETENTION_DAYS
}
pub(crate) fn default_bootstrap_poll_interval_ms() -> u64 {
    1000
}
pub(crate) fn default_bootstrap_max_polls() -> u32 {
    crate::bootstrap::DEFAULT_MAX_POLLS
}
pub(crate) fn default_engine_lock_stale_seconds() -> u64 {
    30
}
pub(crate) fn default_engine_lock_spin_attempts() -> u32 {
    200
}
