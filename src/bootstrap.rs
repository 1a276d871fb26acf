//! Table provisioning for the mutex store.
//!
//! Describes the table and drives it to a usable state:
//!
//! ```text
//! describe -> not found  -> create -> wait -> enable TTL
//!          -> CREATING   -> wait -> enable TTL
//!          -> DELETING   -> fail (DeleteInProgress)
//!          -> ACTIVE/UPDATING -> done
//!          -> other      -> fail (BootstrapFailed)
//! ```
//!
//! Waiting polls `describe` on a fixed interval for a bounded number of
//! rounds. This is operator tooling: two processes bootstrapping the same
//! table at once may both see "not found" and one of them will fail.

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::engine::{Engine, EngineError, TableSchema, TableStatus};
use crate::error::{LatchkeyError, Result};
use crate::events::TTL_ATTRIBUTE;
use std::time::Duration;
use tracing::{debug, info};

/// Default delay between status polls while waiting for creation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of polls before giving up on creation.
pub const DEFAULT_MAX_POLLS: u32 = 60;

/// How a bootstrap run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The table was already usable; nothing was changed.
    AlreadyActive,
    /// The table did not exist and was created.
    Created,
    /// Someone else was creating the table; this run waited for it.
    WaitedForCreation,
}

impl std::fmt::Display for BootstrapOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapOutcome::AlreadyActive => write!(f, "already active"),
            BootstrapOutcome::Created => write!(f, "created"),
            BootstrapOutcome::WaitedForCreation => write!(f, "waited for creation"),
        }
    }
}

/// Provisions one table through an engine.
#[derive(Debug)]
pub struct TableBootstrap<E, C> {
    engine: E,
    clock: C,
    table: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl<E: Engine, C: Clock> TableBootstrap<E, C> {
    pub fn new(engine: E, clock: C, table: impl Into<String>) -> Self {
        Self {
            engine,
            clock,
            table: table.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    /// Make sure the table exists and accepts requests.
    pub fn run(&self, cancel: &CancelToken) -> Result<BootstrapOutcome> {
        let outcome = match self.engine.describe_table(&self.table) {
            Ok(description) => match description.status {
                TableStatus::Active | TableStatus::Updating => {
                    debug!(table = %self.table, status = %description.status, "table ready");
                    return Ok(BootstrapOutcome::AlreadyActive);
                }
                TableStatus::Creating => {
                    info!(table = %self.table, "table is being created, waiting");
                    self.wait_for_active(cancel)?;
                    BootstrapOutcome::WaitedForCreation
                }
                TableStatus::Deleting => {
                    return Err(LatchkeyError::DeleteInProgress(self.table.clone()));
                }
                TableStatus::Other(status) => {
                    return Err(LatchkeyError::BootstrapFailed(format!(
                        "table '{}' has unexpected status '{}'",
                        self.table, status
                    )));
                }
            },
            Err(EngineError::ResourceNotFound(_)) => {
                info!(table = %self.table, "creating table");
                self.engine
                    .create_table(&TableSchema::entity_revision(&self.table))
                    .map_err(|e| self.failed("create table", e))?;
                self.wait_for_active(cancel)?;
                BootstrapOutcome::Created
            }
            Err(e) => return Err(self.failed("describe table", e)),
        };

        self.engine
            .update_time_to_live(&self.table, TTL_ATTRIBUTE, true)
            .map_err(|e| self.failed("enable TTL", e))?;
        info!(table = %self.table, %outcome, "table bootstrap complete");
        Ok(outcome)
    }

    fn wait_for_active(&self, cancel: &CancelToken) -> Result<()> {
        for poll in 1..=self.max_polls {
            self.clock.sleep(self.poll_interval, cancel)?;
            match self.engine.describe_table(&self.table) {
                Ok(description) if description.status.accepts_requests() => return Ok(()),
                Ok(description) if description.status == TableStatus::Deleting => {
                    return Err(LatchkeyError::DeleteInProgress(self.table.clone()));
                }
                Ok(description) => {
                    debug!(table = %self.table, poll, status = %description.status, "still waiting");
                }
                // The new table may not be visible to describe yet.
                Err(EngineError::ResourceNotFound(_)) => {
                    debug!(table = %self.table, poll, "table not visible yet");
                }
                Err(e) => return Err(self.failed("describe table", e)),
            }
        }
        Err(LatchkeyError::BootstrapTimedOut(self.table.clone()))
    }

    fn failed(&self, step: &str, err: EngineError) -> LatchkeyError {
        match LatchkeyError::from(err) {
            LatchkeyError::Storage(msg) => {
                LatchkeyError::BootstrapFailed(format!("{} '{}': {}", step, self.table, msg))
            }
            transient => transient,
        }
    }
}
