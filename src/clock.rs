//! The clock capability: the only time dependency of the lock manager and
//! table bootstrap, substitutable for deterministic tests.

use crate::cancel::CancelToken;
use crate::error::{LatchkeyError, Result};
use std::sync::Mutex;
use std::time::Duration;

/// Something that can pause the calling thread.
pub trait Clock: Send + Sync {
    /// Pause for `duration`, aborting with `Cancelled` if `cancel` fires.
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<()>;
}

/// Real clock backed by the OS scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<()> {
        if cancel.wait_timeout(duration) {
            return Err(LatchkeyError::Cancelled);
        }
        Ok(())
    }
}

/// Clock that never blocks and records how long it was asked to sleep.
#[derive(Debug, Default)]
pub struct ManualClock {
    paused: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time slept so far.
    pub fn paused(&self) -> Duration {
        *self
            .paused
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Every requested sleep, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

impl Clock for ManualClock {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(LatchkeyError::Cancelled);
        }
        *self
            .paused
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()) += duration;
        self.sleeps
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(duration);
        Ok(())
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<()> {
        (**self).sleep(duration, cancel)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<()> {
        (**self).sleep(duration, cancel)
    }
}
