//! Implementation of the `latchkey init` command.
//!
//! Provisions the mutex table in the data directory. Running it again on a
//! ready table changes nothing.

use super::{Session, output_error};
use crate::bootstrap::TableBootstrap;
use crate::clock::SystemClock;
use crate::context::RequestContext;
use crate::error::Result;
use std::io::Write;

pub fn cmd_init(session: &Session, ctx: &RequestContext, out: &mut dyn Write) -> Result<()> {
    let config = session.config();
    let outcome = TableBootstrap::new(session.engine(), SystemClock, session.table())
        .with_polling(config.bootstrap_poll_interval(), config.bootstrap_max_polls)
        .run(&ctx.cancel)?;

    writeln!(
        out,
        "Table '{}' in {}: {}",
        session.table(),
        session.engine().root().display(),
        outcome
    )
    .map_err(output_error)
}
