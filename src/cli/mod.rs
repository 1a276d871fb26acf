//! CLI argument parsing for latchkey.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Latchkey: named mutexes shared between processes and machines.
///
/// A mutex is created once by name, then locked and unlocked. Every
/// transition is recorded as an audit event next to the mutex state.
#[derive(Parser, Debug)]
#[command(name = "latchkey")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file (default: .latchkey/config.yaml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the data directory from the config file.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for latchkey.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provision the mutex table.
    ///
    /// Creates the table if missing, waits for it to become active,
    /// and enables event expiry. Safe to run repeatedly.
    Init,

    /// Create a new, unlocked mutex.
    Create(CreateArgs),

    /// Lock a mutex, retrying while someone else holds it.
    Lock(LockArgs),

    /// Unlock a mutex. Not retried.
    Unlock(UnlockArgs),

    /// Show whether a mutex is locked, and by whom.
    Status(StatusArgs),

    /// Show the audit events of a mutex.
    History(HistoryArgs),

    /// Delete expired audit events from the data directory.
    Purge,
}

/// Arguments for the `create` command.
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Name of the mutex.
    pub name: String,

    /// What the mutex protects.
    #[arg(short, long, default_value = "")]
    pub description: String,
}

/// Arguments for the `lock` command.
#[derive(Parser, Debug)]
pub struct LockArgs {
    /// Name of the mutex.
    pub name: String,

    /// Why the mutex is being held.
    #[arg(short, long, default_value = "")]
    pub message: String,

    /// Give up after this many seconds (overrides `lock_timeout_secs`).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Arguments for the `unlock` command.
#[derive(Parser, Debug)]
pub struct UnlockArgs {
    /// Name of the mutex.
    pub name: String,

    /// Note recorded on the unlock event.
    #[arg(short, long, default_value = "")]
    pub message: String,
}

/// Arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Name of the mutex.
    pub name: String,

    /// Read the latest committed state instead of a possibly stale copy.
    #[arg(long, action = ArgAction::SetTrue)]
    pub consistent: bool,

    /// Print JSON instead of text.
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,
}

/// Arguments for the `history` command.
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Name of the mutex.
    pub name: String,

    /// Print one JSON object per event instead of text.
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
