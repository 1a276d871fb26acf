//! In-process engine backed by a mutex-protected map.

use super::condition::{is_expired, plan_transaction, project};
use super::error::{EngineError, EngineResult};
use super::types::{
    Consistency, Item, Key, TableDescription, TableSchema, TableStatus, TransactWriteItem,
    TransactWriteRequest, Update,
};
use super::{Engine, IDEMPOTENCY_WINDOW_SECS};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Engine that keeps every table in memory.
///
/// Reads are always strongly consistent. Tables can be told to linger in
/// `CREATING` for a number of describe calls, and transient faults can be
/// injected, so provisioning and retry paths are testable without a real
/// service.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: Mutex<MemoryState>,
    creation_polls: u32,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeMap<String, MemoryTable>,
    /// Committed request tokens and when they were committed (unix seconds).
    committed_tokens: HashMap<String, i64>,
    injected_faults: u32,
}

#[derive(Debug)]
struct MemoryTable {
    status: TableStatus,
    ttl_attribute: Option<String>,
    pending_polls: u32,
    items: BTreeMap<Key, Item>,
}

impl MemoryEngine {
    /// Create an engine with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// New tables report `CREATING` for the next `polls` describe calls.
    pub fn with_creation_polls(polls: u32) -> Self {
        Self {
            creation_polls: polls,
            ..Self::default()
        }
    }

    /// Create an engine with one active table already in place.
    pub fn with_table(name: &str) -> Self {
        let engine = Self::new();
        engine.lock_state().tables.insert(
            name.to_string(),
            MemoryTable {
                status: TableStatus::Active,
                ttl_attribute: None,
                pending_polls: 0,
                items: BTreeMap::new(),
            },
        );
        engine
    }

    /// Force a table into the given status, creating an empty one if needed.
    pub fn set_table_status(&self, name: &str, status: TableStatus) {
        let mut state = self.lock_state();
        let table = state
            .tables
            .entry(name.to_string())
            .or_insert_with(|| MemoryTable {
                status: TableStatus::Active,
                ttl_attribute: None,
                pending_polls: 0,
                items: BTreeMap::new(),
            });
        table.status = status;
        table.pending_polls = 0;
    }

    /// Make the next `count` calls fail with `Unavailable`.
    pub fn inject_unavailable(&self, count: u32) {
        self.lock_state().injected_faults = count;
    }

    /// Number of stored items in a table, expired ones included.
    pub fn item_count(&self, table: &str) -> usize {
        self.lock_state()
            .tables
            .get(table)
            .map(|t| t.items.len())
            .unwrap_or(0)
    }

    fn lock_state(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Lock the state, consuming an injected fault if one is pending.
    fn begin(&self) -> EngineResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock_state();
        if state.injected_faults > 0 {
            state.injected_faults -= 1;
            return Err(EngineError::Unavailable(
                "injected transient fault".to_string(),
            ));
        }
        Ok(state)
    }
}

impl MemoryState {
    fn active_table(&self, name: &str) -> EngineResult<&MemoryTable> {
        match self.tables.get(name) {
            Some(table) if table.status.accepts_requests() => Ok(table),
            _ => Err(EngineError::ResourceNotFound(format!(
                "table '{}' not found",
                name
            ))),
        }
    }

    fn active_table_mut(&mut self, name: &str) -> EngineResult<&mut MemoryTable> {
        match self.tables.get_mut(name) {
            Some(table) if table.status.accepts_requests() => Ok(table),
            _ => Err(EngineError::ResourceNotFound(format!(
                "table '{}' not found",
                name
            ))),
        }
    }

    fn live_item(&self, table: &str, key: &Key, now: i64) -> EngineResult<Option<Item>> {
        let table = self.active_table(table)?;
        Ok(table
            .items
            .get(key)
            .filter(|item| !is_expired(item, table.ttl_attribute.as_deref(), now))
            .cloned())
    }

    fn forget_tokens_before(&mut self, cutoff: i64) {
        self.committed_tokens
            .retain(|_, committed_at| *committed_at >= cutoff);
    }

    fn commit(&mut self, members: &[TransactWriteItem]) -> EngineResult<()> {
        let now = Utc::now().timestamp();
        let writes = plan_transaction(members, |table, key| self.live_item(table, key, now))?;
        for write in writes {
            self.active_table_mut(&write.table)?
                .items
                .insert(write.key, write.item);
        }
        Ok(())
    }
}

impl Engine for MemoryEngine {
    fn transact_write(&self, request: TransactWriteRequest) -> EngineResult<()> {
        let mut state = self.begin()?;
        let now = Utc::now().timestamp();
        state.forget_tokens_before(now - IDEMPOTENCY_WINDOW_SECS as i64);
        if state
            .committed_tokens
            .contains_key(&request.client_request_token)
        {
            return Ok(());
        }
        state.commit(&request.items)?;
        state
            .committed_tokens
            .insert(request.client_request_token, now);
        Ok(())
    }

    fn update_item(&self, update: Update) -> EngineResult<()> {
        let mut state = self.begin()?;
        state
            .commit(&[TransactWriteItem::Update(update)])
            .map_err(|e| match e {
                EngineError::TransactionCanceled { .. } => EngineError::ConditionalCheckFailed,
                other => other,
            })
    }

    fn get_item(
        &self,
        table: &str,
        key: &Key,
        projection: Option<&[&str]>,
        _consistency: Consistency,
    ) -> EngineResult<Option<Item>> {
        let state = self.begin()?;
        let item = state.live_item(table, key, Utc::now().timestamp())?;
        Ok(item.map(|item| project(item, projection)))
    }

    fn query(
        &self,
        table: &str,
        partition: &str,
        _consistency: Consistency,
    ) -> EngineResult<Vec<Item>> {
        let state = self.begin()?;
        let table = state.active_table(table)?;
        let now = Utc::now().timestamp();
        Ok(table
            .items
            .range(Key::new(partition, i64::MIN)..=Key::new(partition, i64::MAX))
            .map(|(_, item)| item)
            .filter(|item| !is_expired(item, table.ttl_attribute.as_deref(), now))
            .cloned()
            .collect())
    }

    fn describe_table(&self, table: &str) -> EngineResult<TableDescription> {
        let mut state = self.begin()?;
        let entry = state
            .tables
            .get_mut(table)
            .ok_or_else(|| EngineError::ResourceNotFound(format!("table '{}' not found", table)))?;

        if entry.status == TableStatus::Creating {
            if entry.pending_polls == 0 {
                entry.status = TableStatus::Active;
            } else {
                entry.pending_polls -= 1;
            }
        }

        Ok(TableDescription {
            name: table.to_string(),
            status: entry.status.clone(),
            ttl_attribute: entry.ttl_attribute.clone(),
        })
    }

    fn create_table(&self, schema: &TableSchema) -> EngineResult<()> {
        let mut state = self.begin()?;
        if state.tables.contains_key(&schema.name) {
            return Err(EngineError::ResourceInUse(format!(
                "table '{}' already exists",
                schema.name
            )));
        }
        let status = if self.creation_polls > 0 {
            TableStatus::Creating
        } else {
            TableStatus::Active
        };
        state.tables.insert(
            schema.name.clone(),
            MemoryTable {
                status,
                ttl_attribute: None,
                pending_polls: self.creation_polls,
                items: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn update_time_to_live(
        &self,
        table: &str,
        attribute: &str,
        enabled: bool,
    ) -> EngineResult<()> {
        let mut state = self.begin()?;
        let table = state.active_table_mut(table)?;
        table.ttl_attribute = enabled.then(|| attribute.to_string());
        Ok(())
    }
}
