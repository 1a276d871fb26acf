//! Lock acquisition and stale-lock breaking.

use super::guard::LockGuard;
use super::metadata::LockMetadata;
use crate::engine::{EngineError, EngineResult};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// How hard to try for a held lock, and when to consider it abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
    /// A lock older than this many seconds is broken.
    pub stale_seconds: u64,

    /// Acquisition attempts before giving up.
    pub spin_attempts: u32,

    /// Pause between attempts.
    pub spin_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            stale_seconds: 30,
            spin_attempts: 200,
            spin_interval: Duration::from_millis(10),
        }
    }
}

/// Acquire a lock file, spinning while another process holds it.
///
/// # Returns
///
/// * `Ok(LockGuard)` - Lock acquired; released when the guard drops
/// * `Err(EngineError::Throttled)` - Still held after every attempt
/// * `Err(EngineError::Io)` - The lock file could not be created or written
pub fn acquire_lock(lock_path: &Path, action: &str, options: &LockOptions) -> EngineResult<LockGuard> {
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            EngineError::Io(format!(
                "failed to create lock directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let metadata = LockMetadata::new(action);
    let attempts = options.spin_attempts.max(1);
    for attempt in 0..attempts {
        if let Some(guard) = try_create(lock_path, &metadata)? {
            return Ok(guard);
        }
        if break_stale_lock(lock_path, options.stale_seconds)? {
            continue;
        }
        if attempt + 1 < attempts {
            std::thread::sleep(options.spin_interval);
        }
    }

    let holder = match LockMetadata::from_file(lock_path) {
        Ok(meta) => format!(
            " (created {} ago by {}, action: {})",
            meta.age_string(),
            meta.owner,
            meta.action
        ),
        Err(_) => String::new(),
    };
    Err(EngineError::Throttled(format!(
        "lock '{}' is held by another process{}",
        lock_path.display(),
        holder
    )))
}

/// Remove the lock file if it is older than `stale_seconds`.
///
/// A lock whose metadata cannot be read (crash between create and write) is
/// judged by its file modification time instead. Returns whether the lock is
/// gone.
///
/// Breakers serialize on a sibling `<lock>.break` file and judge the lock
/// again while holding it, so a lock re-created by another breaker is never
/// removed on the strength of an earlier stale reading.
pub fn break_stale_lock(lock_path: &Path, stale_seconds: u64) -> EngineResult<bool> {
    match lock_state(lock_path, stale_seconds) {
        LockState::Gone => return Ok(true),
        LockState::Held => return Ok(false),
        LockState::Stale => {}
    }

    let breaker_path = breaker_path(lock_path);
    let Some(breaker) = try_create(&breaker_path, &LockMetadata::new("break-stale-lock"))? else {
        // Breaker left behind by a crash
        if lock_state(&breaker_path, stale_seconds) == LockState::Stale {
            tracing::warn!(path = %breaker_path.display(), "removing abandoned lock breaker");
            remove_lock_file(&breaker_path)?;
        }
        return Ok(false);
    };

    let result = match lock_state(lock_path, stale_seconds) {
        LockState::Gone => Ok(true),
        LockState::Held => Ok(false),
        LockState::Stale => {
            tracing::warn!(
                path = %lock_path.display(),
                stale_seconds,
                "breaking stale lock"
            );
            remove_lock_file(lock_path).map(|()| true)
        }
    };
    drop(breaker);
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockState {
    Gone,
    Held,
    Stale,
}

fn lock_state(lock_path: &Path, stale_seconds: u64) -> LockState {
    match LockMetadata::from_file(lock_path) {
        Ok(meta) if meta.is_stale(stale_seconds) => LockState::Stale,
        Ok(_) => LockState::Held,
        Err(_) => match fs::metadata(lock_path).and_then(|m| m.modified()) {
            Ok(modified)
                if SystemTime::now()
                    .duration_since(modified)
                    .is_ok_and(|age| age.as_secs() > stale_seconds) =>
            {
                LockState::Stale
            }
            Ok(_) => LockState::Held,
            // Released between our create attempt and now
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LockState::Gone,
            Err(_) => LockState::Held,
        },
    }
}

fn breaker_path(lock_path: &Path) -> PathBuf {
    let mut name = lock_path.as_os_str().to_owned();
    name.push(".break");
    PathBuf::from(name)
}

fn remove_lock_file(path: &Path) -> EngineResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EngineError::Io(format!(
            "failed to break stale lock '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// One exclusive-create attempt; `Ok(None)` when the lock is held.
fn try_create(lock_path: &Path, metadata: &LockMetadata) -> EngineResult<Option<LockGuard>> {
    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => {
            return Err(EngineError::Io(format!(
                "failed to acquire lock '{}': {}",
                lock_path.display(),
                e
            )));
        }
    };

    let json = metadata.to_json()?;
    file.write_all(json.as_bytes()).map_err(|e| {
        let _ = fs::remove_file(lock_path);
        EngineError::Io(format!("failed to write lock metadata: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(lock_path);
        EngineError::Io(format!("failed to sync lock file: {}", e))
    })?;

    Ok(Some(LockGuard::new(lock_path.to_path_buf())))
}
