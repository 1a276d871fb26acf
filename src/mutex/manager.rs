//! Lock manager: retried acquisition over a mutex repository.

use super::MutexRepository;
use crate::clock::Clock;
use crate::context::RequestContext;
use crate::error::{LatchkeyError, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delays slept before each lock attempt, in seconds.
pub const DEFAULT_RETRY_DELAYS_SECS: [u64; 5] = [0, 1, 3, 6, 10];

/// Ordered delays consumed by [`LockManager::lock_mutex`], one per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl RetrySchedule {
    /// A schedule with one attempt per delay. Must not be empty.
    pub fn new(delays: Vec<Duration>) -> Result<Self> {
        if delays.is_empty() {
            return Err(LatchkeyError::UserError(
                "retry schedule must contain at least one delay".to_string(),
            ));
        }
        Ok(Self { delays })
    }

    pub fn from_secs(secs: &[u64]) -> Result<Self> {
        Self::new(secs.iter().copied().map(Duration::from_secs).collect())
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    pub fn attempts(&self) -> usize {
        self.delays.len()
    }

    /// Time slept when every attempt is used.
    pub fn total(&self) -> Duration {
        self.delays.iter().sum()
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self {
            delays: DEFAULT_RETRY_DELAYS_SECS
                .iter()
                .copied()
                .map(Duration::from_secs)
                .collect(),
        }
    }
}

/// Creates, locks, and unlocks mutexes; only locking is retried.
#[derive(Debug)]
pub struct LockManager<C, R> {
    clock: C,
    repository: R,
    schedule: RetrySchedule,
}

impl<C: Clock, R: MutexRepository> LockManager<C, R> {
    pub fn new(clock: C, repository: R) -> Self {
        Self {
            clock,
            repository,
            schedule: RetrySchedule::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: RetrySchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn schedule(&self) -> &RetrySchedule {
        &self.schedule
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn create_mutex(&self, ctx: &RequestContext, name: &str, description: &str) -> Result<()> {
        self.repository.create(ctx, name, description)
    }

    /// Lock `name`, sleeping each scheduled delay before an attempt.
    ///
    /// Returns on the first success. Contention and transient engine faults
    /// move on to the next delay; any other error is returned at once. When
    /// the schedule runs out, the last attempt's error is returned. A
    /// cancelled context aborts with `Cancelled`, even mid-sleep.
    pub fn lock_mutex(&self, ctx: &RequestContext, name: &str, message: &str) -> Result<()> {
        let mut last_err = None;

        for (attempt, delay) in self.schedule.delays().iter().enumerate() {
            if ctx.cancel.is_cancelled() {
                return Err(LatchkeyError::Cancelled);
            }
            self.clock.sleep(*delay, &ctx.cancel)?;

            match self.repository.lock(ctx, name, message) {
                Ok(()) => {
                    info!(mutex = name, attempt = attempt + 1, "lock acquired");
                    return Ok(());
                }
                Err(e) if e.is_retryable() => {
                    debug!(mutex = name, attempt = attempt + 1, error = %e, "lock attempt failed");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            mutex = name,
            attempts = self.schedule.attempts(),
            "lock retries exhausted"
        );
        Err(last_err.unwrap_or_else(|| {
            LatchkeyError::UserError("retry schedule must contain at least one delay".to_string())
        }))
    }

    pub fn unlock_mutex(&self, ctx: &RequestContext, name: &str, message: &str) -> Result<()> {
        self.repository.unlock(ctx, name, message)
    }
}
