//! Configuration model for latchkey.
//!
//! This module defines the Config struct that represents `.latchkey/config.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for every field, and validation of config values.
//! A missing config file is not an error: defaults apply.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use model::Config;
pub use operations::DEFAULT_CONFIG_PATH;
pub use types::LogLevel;
