//! Command implementations for latchkey.
//!
//! This module loads configuration, sets up logging, and routes CLI commands
//! to their handlers. Handlers write their output to a caller-supplied writer
//! so they can be exercised in tests.

mod create;
mod history;
mod init;
mod lock;
mod purge;
mod session;
mod status;


pub use session::Session;

use crate::cli::{Cli, Command};
use crate::config::{Config, DEFAULT_CONFIG_PATH};
use crate::context::RequestContext;
use crate::error::{LatchkeyError, Result};
use crate::telemetry;
use std::io::Write;
use std::path::Path;

/// Client type recorded on audit events written by the CLI.
pub const CLIENT_KIND: &str = "cli";

/// Run a parsed command line against the real environment.
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    telemetry::init(config.log_level, cli.verbose);

    let session = Session::new(config, cli.data_dir);
    let ctx = RequestContext::from_env(CLIENT_KIND);
    let stdout = std::io::stdout();
    dispatch(&session, &ctx, cli.command, &mut stdout.lock())
}

/// Dispatch a command to its implementation.
pub fn dispatch(
    session: &Session,
    ctx: &RequestContext,
    command: Command,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Init => init::cmd_init(session, ctx, out),
        Command::Create(args) => create::cmd_create(session, ctx, args, out),
        Command::Lock(args) => lock::cmd_lock(session, ctx, args, out),
        Command::Unlock(args) => lock::cmd_unlock(session, ctx, args, out),
        Command::Status(args) => status::cmd_status(session, args, out),
        Command::History(args) => history::cmd_history(session, args, out),
        Command::Purge => purge::cmd_purge(session, out),
    }
}

/// Load the explicit config file, or the default one if it exists.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(DEFAULT_CONFIG_PATH),
    }
}

/// Map a failed write to stdout into a user-visible error.
pub(crate) fn output_error(e: std::io::Error) -> LatchkeyError {
    LatchkeyError::UserError(format!("failed to write output: {}", e))
}
