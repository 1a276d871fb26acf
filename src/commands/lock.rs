//! Implementation of the `latchkey lock` and `latchkey unlock` commands.

use super::{Session, output_error};
use crate::cancel::CancelToken;
use crate::cli::{LockArgs, UnlockArgs};
use crate::context::RequestContext;
use crate::error::Result;
use std::io::Write;
use std::time::Duration;

/// Lock a mutex, retrying per the configured schedule.
///
/// `--timeout` (or `lock_timeout_secs`) bounds the whole retry loop; when it
/// passes the command fails with exit code 5.
pub fn cmd_lock(
    session: &Session,
    ctx: &RequestContext,
    args: LockArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .or_else(|| session.config().lock_timeout());

    let ctx = match timeout {
        Some(timeout) => ctx.clone().with_cancel(CancelToken::with_timeout(timeout)),
        None => ctx.clone(),
    };

    session
        .manager()?
        .lock_mutex(&ctx, &args.name, &args.message)?;
    writeln!(out, "Locked mutex '{}'", args.name).map_err(output_error)
}

pub fn cmd_unlock(
    session: &Session,
    ctx: &RequestContext,
    args: UnlockArgs,
    out: &mut dyn Write,
) -> Result<()> {
    session
        .manager()?
        .unlock_mutex(ctx, &args.name, &args.message)?;
    writeln!(out, "Unlocked mutex '{}'", args.name).map_err(output_error)
}
