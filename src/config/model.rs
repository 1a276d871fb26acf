//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for latchkey.
///
/// This struct represents the contents of `.latchkey/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Storage settings
    // =========================================================================
    /// Root directory of the file engine (relative paths resolve against the
    /// working directory).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Table holding mutexes and their events.
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Days an audit event is kept before it may be purged.
    #[serde(default = "default_event_retention_days")]
    pub event_retention_days: u32,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Seconds slept before each lock attempt; one attempt per entry.
    #[serde(default = "default_lock_retry_delays_secs")]
    pub lock_retry_delays_secs: Vec<u64>,

    /// Default deadline for `lock`, in seconds. Unset means no deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_timeout_secs: Option<u64>,

    // =========================================================================
    // Bootstrap settings
    // =========================================================================
    #[serde(default = "default_bootstrap_poll_interval_ms")]
    pub bootstrap_poll_interval_ms: u64,

    #[serde(default = "default_bootstrap_max_polls")]
    pub bootstrap_max_polls: u32,

    // =========================================================================
    // File engine settings
    // =========================================================================
    /// Seconds after which a table lock file is considered stale and broken.
    #[serde(default = "default_engine_lock_stale_seconds")]
    pub engine_lock_stale_seconds: u64,

    /// Attempts to take a table lock before reporting the engine busy.
    #[serde(default = "default_engine_lock_spin_attempts")]
    pub engine_lock_spin_attempts: u32,

    // =========================================================================
    // Logging
    // =========================================================================
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            table_name: default_table_name(),
            event_retention_days: default_event_retention_days(),
            lock_retry_delays_secs: default_lock_retry_delays_secs(),
            lock_timeout_secs: None,
            bootstrap_poll_interval_ms: default_bootstrap_poll_interval_ms(),
            bootstrap_max_polls: default_bootstrap_max_polls(),
            engine_lock_stale_seconds: default_engine_lock_stale_seconds(),
            engine_lock_spin_attempts: default_engine_lock_spin_attempts(),
            log_level: LogLevel::default(),
        }
    }
}
