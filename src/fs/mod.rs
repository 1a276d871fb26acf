//! Filesystem utilities for the file-backed engine.
//!
//! Item files, table descriptions, and transaction journals are all written
//! through [`atomic_write`] so a reader never observes a half-written file.

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_json, read_json};
