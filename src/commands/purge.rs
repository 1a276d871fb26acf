//! Implementation of the `latchkey purge` command.

use super::{Session, output_error};
use crate::error::Result;
use std::io::Write;

pub fn cmd_purge(session: &Session, out: &mut dyn Write) -> Result<()> {
    let removed = session.engine().purge_expired(session.table())?;
    tracing::info!(table = session.table(), removed, "purged expired items");
    writeln!(
        out,
        "Purged {} expired item(s) from '{}'",
        removed,
        session.table()
    )
    .map_err(output_error)
}
