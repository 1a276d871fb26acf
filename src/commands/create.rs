//! Implementation of the `latchkey create` command.

use super::{Session, output_error};
use crate::cli::CreateArgs;
use crate::context::RequestContext;
use crate::error::Result;
use std::io::Write;

pub fn cmd_create(
    session: &Session,
    ctx: &RequestContext,
    args: CreateArgs,
    out: &mut dyn Write,
) -> Result<()> {
    session
        .manager()?
        .create_mutex(ctx, &args.name, &args.description)?;
    writeln!(out, "Created mutex '{}'", args.name).map_err(output_error)
}
