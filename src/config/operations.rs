//! Config loading, validation, and conversion into runtime settings.

use super::model::Config;
use crate::engine::FileEngineOptions;
use crate::error::{LatchkeyError, Result};
use crate::locks::LockOptions;
use crate::mutex::RetrySchedule;
use std::path::Path;
use std::time::Duration;

/// Where the CLI looks for its config when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = ".latchkey/config.yaml";

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(LatchkeyError::UserError)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LatchkeyError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LatchkeyError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            LatchkeyError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `data_dir` and `table_name` must be non-empty
    /// - `lock_retry_delays_secs` must have at least one entry
    /// - retention, polling, and engine lock settings must be positive
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.trim().is_empty() {
            return Err(invalid("data_dir must not be empty"));
        }
        if self.table_name.trim().is_empty() {
            return Err(invalid("table_name must not be empty"));
        }
        if self.lock_retry_delays_secs.is_empty() {
            return Err(invalid("lock_retry_delays_secs must contain at least one delay"));
        }

        let positive = [
            ("event_retention_days", u64::from(self.event_retention_days)),
            ("bootstrap_poll_interval_ms", self.bootstrap_poll_interval_ms),
            ("bootstrap_max_polls", u64::from(self.bootstrap_max_polls)),
            ("engine_lock_stale_seconds", self.engine_lock_stale_seconds),
            (
                "engine_lock_spin_attempts",
                u64::from(self.engine_lock_spin_attempts),
            ),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(invalid(&format!("{} must be greater than 0", field)));
            }
        }

        if self.lock_timeout_secs == Some(0) {
            return Err(invalid("lock_timeout_secs must be greater than 0 when set"));
        }

        Ok(())
    }

    /// The lock manager's retry schedule.
    pub fn retry_schedule(&self) -> Result<RetrySchedule> {
        RetrySchedule::from_secs(&self.lock_retry_delays_secs)
    }

    pub fn bootstrap_poll_interval(&self) -> Duration {
        Duration::from_millis(self.bootstrap_poll_interval_ms)
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_secs.map(Duration::from_secs)
    }

    pub fn file_engine_options(&self) -> FileEngineOptions {
        FileEngineOptions {
            lock: LockOptions {
                stale_seconds: self.engine_lock_stale_seconds,
                spin_attempts: self.engine_lock_spin_attempts,
                ..LockOptions::default()
            },
        }
    }
}

fn invalid(reason: &str) -> LatchkeyError {
    LatchkeyError::UserError(format!("config validation failed: {}", reason))
}
