//! Latchkey: named mutexes persisted in a transactional document store.
//!
//! A mutex is created once by name and then cycles between unlocked and
//! locked. Each transition is a single conditional transaction that updates
//! the mutex's current-state row and appends an audit event, so concurrent
//! callers in different processes coordinate purely through the engine.
//!
//! The main entry points are [`mutex::MutexStore`] (one attempt per
//! transition), [`mutex::LockManager`] (retried locking on a fixed schedule),
//! and [`bootstrap::TableBootstrap`] (table provisioning).

pub mod bootstrap;
pub mod cancel;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod mutex;
pub mod telemetry;

#[cfg(test)]
mod test_support;
