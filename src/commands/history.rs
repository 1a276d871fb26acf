//! Implementation of the `latchkey history` command.

use super::{Session, output_error};
use crate::cli::HistoryArgs;
use crate::error::{LatchkeyError, Result};
use crate::events::Event;
use std::io::Write;

/// Print the audit events of a mutex, oldest first.
pub fn cmd_history(session: &Session, args: HistoryArgs, out: &mut dyn Write) -> Result<()> {
    let events = session.store().history(&args.name)?;

    for event in &events {
        if args.json {
            let line = serde_json::to_string(event)
                .map_err(|e| LatchkeyError::Storage(format!("failed to encode event: {}", e)))?;
            writeln!(out, "{}", line).map_err(output_error)?;
        } else {
            writeln!(out, "{}", format_event(event)).map_err(output_error)?;
        }
    }
    Ok(())
}

fn format_event(event: &Event) -> String {
    let mut line = format!(
        "{:>4}  {}  {:<14}  {}",
        event.revision,
        event.created.format("%Y-%m-%dT%H:%M:%SZ"),
        event.event_type.to_string(),
        event.euser.name
    );
    if event.ruser.name != event.euser.name && !event.ruser.name.is_empty() {
        line.push_str(&format!(" (for {})", event.ruser.name));
    }
    for (key, value) in &event.data {
        if !value.is_empty() {
            line.push_str(&format!("  {}={:?}", key, value));
        }
    }
    line
}
