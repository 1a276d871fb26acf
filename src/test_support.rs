use crate::context::{ClientInfo, RequestContext, User};
use crate::error::{LatchkeyError, Result};
use crate::mutex::MutexRepository;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// A context for user `name` acting for themselves through a test client.
pub(crate) fn test_ctx(name: &str) -> RequestContext {
    RequestContext::new(ClientInfo::of_kind("test"), User::named(name))
}

/// One call observed by [`ScriptedRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RepoCall {
    Create(String),
    Lock(String),
    Unlock(String),
}

/// Repository whose lock outcomes are scripted ahead of time.
///
/// Each lock call pops the next scripted result; once the script is empty
/// every further lock succeeds. Create and unlock always succeed.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRepository {
    lock_results: Mutex<VecDeque<Result<()>>>,
    calls: Mutex<Vec<RepoCall>>,
}

impl ScriptedRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` lock attempts with `AlreadyLocked`.
    pub(crate) fn failing_locks(count: usize) -> Self {
        let repo = Self::new();
        for _ in 0..count {
            repo.push_lock_result(Err(LatchkeyError::AlreadyLocked("scripted".into())));
        }
        repo
    }

    /// Never let a lock attempt succeed.
    pub(crate) fn always_locked(max_attempts: usize) -> Self {
        let repo = Self::new();
        for attempt in 1..=max_attempts {
            repo.push_lock_result(Err(LatchkeyError::AlreadyLocked(format!(
                "attempt-{}",
                attempt
            ))));
        }
        repo
    }

    pub(crate) fn push_lock_result(&self, result: Result<()>) {
        guard(&self.lock_results).push_back(result);
    }

    pub(crate) fn calls(&self) -> Vec<RepoCall> {
        guard(&self.calls).clone()
    }

    pub(crate) fn lock_attempts(&self) -> usize {
        guard(&self.calls)
            .iter()
            .filter(|c| matches!(c, RepoCall::Lock(_)))
            .count()
    }
}

impl MutexRepository for ScriptedRepository {
    fn create(&self, _ctx: &RequestContext, name: &str, _description: &str) -> Result<()> {
        guard(&self.calls).push(RepoCall::Create(name.to_string()));
        Ok(())
    }

    fn lock(&self, _ctx: &RequestContext, name: &str, _message: &str) -> Result<()> {
        guard(&self.calls).push(RepoCall::Lock(name.to_string()));
        guard(&self.lock_results).pop_front().unwrap_or(Ok(()))
    }

    fn unlock(&self, _ctx: &RequestContext, name: &str, _message: &str) -> Result<()> {
        guard(&self.calls).push(RepoCall::Unlock(name.to_string()));
        Ok(())
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}
