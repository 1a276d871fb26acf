//! Implementation of the `latchkey status` command.

use super::{Session, output_error};
use crate::cli::StatusArgs;
use crate::engine::Consistency;
use crate::error::{LatchkeyError, Result};
use std::io::Write;

/// Print the lock state of a mutex.
///
/// Reads are eventually consistent unless `--consistent` is given.
pub fn cmd_status(session: &Session, args: StatusArgs, out: &mut dyn Write) -> Result<()> {
    let consistency = if args.consistent {
        Consistency::Strong
    } else {
        Consistency::Eventual
    };
    let view = session.store().get(&args.name, consistency)?;

    if args.json {
        let json = serde_json::to_string_pretty(&view)
            .map_err(|e| LatchkeyError::Storage(format!("failed to encode status: {}", e)))?;
        return writeln!(out, "{}", json).map_err(output_error);
    }

    writeln!(out, "Mutex:     {}", args.name).map_err(output_error)?;
    writeln!(out, "Version:   {}", view.version).map_err(output_error)?;
    writeln!(
        out,
        "Locked:    {}",
        if view.locked { "yes" } else { "no" }
    )
    .map_err(output_error)?;
    if let Some(locked_by) = &view.locked_by {
        writeln!(out, "Locked by: {}", locked_by).map_err(output_error)?;
    }
    if let Some(message) = view.message.as_deref().filter(|m| !m.is_empty()) {
        writeln!(out, "Message:   {}", message).map_err(output_error)?;
    }
    Ok(())
}
