//! Backing engine contract for latchkey.
//!
//! The mutex store needs only a handful of primitives from its storage:
//! an all-or-nothing conditional multi-item write, a single-item conditional
//! update, point reads with a projection and a choice of consistency, a
//! partition query, and table management (describe, create, enable TTL).
//! Anything offering those can back the store.
//!
//! Two implementations ship with the crate:
//! - [`MemoryEngine`]: in-process, used for tests and embedding.
//! - [`FileEngine`]: durable, one directory per table, transactions
//!   serialized through an exclusive-create lock file and a replayable
//!   journal.

mod condition;
mod error;
mod file;
mod memory;
mod types;


pub use condition::{PlannedWrite, apply_actions, is_expired, plan_transaction, project, resolve};
pub use error::{EngineError, EngineResult};
pub use file::{FileEngine, FileEngineOptions};
pub use memory::MemoryEngine;
pub use types::{
    CancellationReason, Condition, Consistency, Item, Key, PARTITION_KEY, Put, SORT_KEY,
    TableDescription, TableSchema, TableStatus, TransactWriteItem, TransactWriteRequest, Update,
    UpdateAction,
};

use std::sync::Arc;

/// How long a committed client request token is remembered for replays.
pub const IDEMPOTENCY_WINDOW_SECS: u64 = 600;

/// Primitives a backing engine must provide.
///
/// All methods take `&self`; implementations handle their own
/// synchronization so one engine can serve many callers.
pub trait Engine: Send + Sync {
    /// Apply every member or none of them.
    ///
    /// Conditions are evaluated against the state at the start of the
    /// transaction. On failure returns `TransactionCanceled` with one reason
    /// per member, in order.
    fn transact_write(&self, request: TransactWriteRequest) -> EngineResult<()>;

    /// Conditionally update a single item.
    fn update_item(&self, update: Update) -> EngineResult<()>;

    /// Read one item, `None` if absent or expired.
    fn get_item(
        &self,
        table: &str,
        key: &Key,
        projection: Option<&[&str]>,
        consistency: Consistency,
    ) -> EngineResult<Option<Item>>;

    /// All live items of one partition, ordered by sort key.
    fn query(
        &self,
        table: &str,
        partition: &str,
        consistency: Consistency,
    ) -> EngineResult<Vec<Item>>;

    fn describe_table(&self, table: &str) -> EngineResult<TableDescription>;

    fn create_table(&self, schema: &TableSchema) -> EngineResult<()>;

    /// Enable or disable expiry on the named attribute. Idempotent.
    fn update_time_to_live(&self, table: &str, attribute: &str, enabled: bool)
    -> EngineResult<()>;
}

impl<E: Engine + ?Sized> Engine for &E {
    fn transact_write(&self, request: TransactWriteRequest) -> EngineResult<()> {
        (**self).transact_write(request)
    }

    fn update_item(&self, update: Update) -> EngineResult<()> {
        (**self).update_item(update)
    }

    fn get_item(
        &self,
        table: &str,
        key: &Key,
        projection: Option<&[&str]>,
        consistency: Consistency,
    ) -> EngineResult<Option<Item>> {
        (**self).get_item(table, key, projection, consistency)
    }

    fn query(
        &self,
        table: &str,
        partition: &str,
        consistency: Consistency,
    ) -> EngineResult<Vec<Item>> {
        (**self).query(table, partition, consistency)
    }

    fn describe_table(&self, table: &str) -> EngineResult<TableDescription> {
        (**self).describe_table(table)
    }

    fn create_table(&self, schema: &TableSchema) -> EngineResult<()> {
        (**self).create_table(schema)
    }

    fn update_time_to_live(
        &self,
        table: &str,
        attribute: &str,
        enabled: bool,
    ) -> EngineResult<()> {
        (**self).update_time_to_live(table, attribute, enabled)
    }
}

impl<E: Engine + ?Sized> Engine for Arc<E> {
    fn transact_write(&self, request: TransactWriteRequest) -> EngineResult<()> {
        (**self).transact_write(request)
    }

    fn update_item(&self, update: Update) -> EngineResult<()> {
        (**self).update_item(update)
    }

    fn get_item(
        &self,
        table: &str,
        key: &Key,
        projection: Option<&[&str]>,
        consistency: Consistency,
    ) -> EngineResult<Option<Item>> {
        (**self).get_item(table, key, projection, consistency)
    }

    fn query(
        &self,
        table: &str,
        partition: &str,
        consistency: Consistency,
    ) -> EngineResult<Vec<Item>> {
        (**self).query(table, partition, consistency)
    }

    fn describe_table(&self, table: &str) -> EngineResult<TableDescription> {
        (**self).describe_table(table)
    }

    fn create_table(&self, schema: &TableSchema) -> EngineResult<()> {
        (**self).create_table(schema)
    }

    fn update_time_to_live(
        &self,
        table: &str,
        attribute: &str,
        enabled: bool,
    ) -> EngineResult<()> {
        (**self).update_time_to_live(table, attribute, enabled)
    }
}
