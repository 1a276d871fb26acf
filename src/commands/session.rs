//! Wiring shared by every command: config, engine, store, manager.

use crate::clock::SystemClock;
use crate::config::Config;
use crate::engine::FileEngine;
use crate::error::Result;
use crate::mutex::{LockManager, MutexStore};
use std::path::PathBuf;

/// Resolved settings and the engine they point at.
#[derive(Debug)]
pub struct Session {
    config: Config,
    engine: FileEngine,
}

impl Session {
    /// Build a session; `data_dir` overrides the configured one.
    pub fn new(config: Config, data_dir: Option<PathBuf>) -> Self {
        let root = data_dir.unwrap_or_else(|| PathBuf::from(&config.data_dir));
        let engine = FileEngine::with_options(root, config.file_engine_options());
        Self { config, engine }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &FileEngine {
        &self.engine
    }

    pub fn table(&self) -> &str {
        &self.config.table_name
    }

    pub fn store(&self) -> MutexStore<&FileEngine> {
        MutexStore::new(&self.engine, self.table())
            .with_retention_days(self.config.event_retention_days)
    }

    pub fn manager(&self) -> Result<LockManager<SystemClock, MutexStore<&FileEngine>>> {
        Ok(LockManager::new(SystemClock, self.store()).with_schedule(self.config.retry_schedule()?))
    }
}
