//! Table lock files for the file-backed engine.
//!
//! Every transaction and strongly-consistent read on a file-backed table runs
//! while holding that table's lock file (`<table>/table.lock`). Lock files are
//! created with **create_new** semantics (exclusive create), so only one
//! process holds a given table lock at a time.
//!
//! # Lock Metadata
//!
//! Each lock file contains JSON metadata:
//! - `owner`: The owner of the lock (e.g., `user@HOST`)
//! - `pid`: The process ID (optional)
//! - `created_at`: RFC3339 timestamp
//! - `action`: The engine operation holding the lock (transact/read/purge/...)
//!
//! # Contention and stale locks
//!
//! A held lock is retried a bounded number of times before the engine reports
//! `Throttled`. A lock older than the stale threshold is assumed to belong to
//! a crashed process and is broken with a warning.
//!
//! # RAII Guards
//!
//! Locks are released when their guard is dropped. If deletion fails during
//! drop, a warning is logged but the program does not crash.

mod guard;
mod metadata;
mod operations;

#[cfg(test)]
mod tests;

pub use guard::LockGuard;
pub use metadata::LockMetadata;
pub use operations::{LockOptions, acquire_lock, break_stale_lock};
