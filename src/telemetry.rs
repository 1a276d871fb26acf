//! Logging setup for the CLI.
//!
//! `RUST_LOG` wins when set. Otherwise the configured level applies, raised
//! to `debug` by `--verbose`. Logs go to stderr so command output on stdout
//! stays machine-readable.

use crate::config::LogLevel;
use tracing_subscriber::EnvFilter;

/// Pick the filter directive used when `RUST_LOG` is absent.
pub fn default_directive(level: LogLevel, verbose: bool) -> &'static str {
    if verbose && matches!(level, LogLevel::Error | LogLevel::Warn | LogLevel::Info) {
        LogLevel::Debug.as_filter()
    } else {
        level.as_filter()
    }
}

/// Initialize the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(level: LogLevel, verbose: bool) {
    let directive = default_directive(level, verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
