//! Cooperative cancellation for blocking operations.
//!
//! A [`CancelToken`] is cheap to clone and shared between the caller and
//! whatever is blocking on its behalf. Cancellation is triggered either
//! explicitly with [`CancelToken::cancel`] or by an optional deadline.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
}

/// Shared cancellation flag with an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that is only cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also cancels itself once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Cancel the token, waking every waiter.
    pub fn cancel(&self) {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        *cancelled = true;
        self.inner.wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.deadline_passed()
            || *self
                .inner
                .cancelled
                .lock()
                .unwrap_or_else(|poison| poison.into_inner())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Block for up to `duration`, returning early if cancelled.
    ///
    /// Returns `true` if the token was cancelled (before or during the wait).
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let start = Instant::now();
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());

        loop {
            if *cancelled || self.deadline_passed() {
                return true;
            }
            let elapsed = start.elapsed();
            if elapsed >= duration {
                return false;
            }

            let mut remaining = duration - elapsed;
            if let Some(deadline) = self.deadline {
                remaining = remaining.min(deadline.saturating_duration_since(Instant::now()));
            }
            cancelled = self
                .inner
                .wakeup
                .wait_timeout(cancelled, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poison| poison.into_inner().0);
        }
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
