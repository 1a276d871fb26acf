//! Latchkey CLI entry point.
//!
//! Parses arguments, dispatches to the appropriate command handler, and
//! handles errors with proper exit codes.

use latchkey::cli::Cli;
use latchkey::{commands, exit_codes};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match commands::run(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
