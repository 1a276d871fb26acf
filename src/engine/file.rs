//! Durable engine that stores each table in a directory.
//!
//! # Layout
//!
//! ```text
//! <root>/<table>/table.json                  table description
//! <root>/<table>/table.lock                  held during writes and strong reads
//! <root>/<table>/items/<hex partition>/<sort>.json
//! <root>/<table>/txn/<token>.pending.json    journal of an in-flight transaction
//! <root>/<table>/txn/<token>.committed       marker for idempotent replays
//! ```
//!
//! A transaction evaluates its conditions under the table lock, writes its
//! final item states to a journal, applies them with atomic writes, and then
//! marks the journal committed. Whoever takes the lock next replays any
//! journal still pending, so an interrupted transaction ends up fully applied.
//! Eventually-consistent reads skip the lock and may observe a transaction
//! half-applied; strongly-consistent reads never do.

use super::condition::{PlannedWrite, is_expired, plan_transaction, project};
use super::error::{EngineError, EngineResult};
use super::types::{
    Consistency, Item, Key, TableDescription, TableSchema, TableStatus, TransactWriteItem,
    TransactWriteRequest, Update,
};
use super::{Engine, IDEMPOTENCY_WINDOW_SECS};
use crate::fs::{atomic_write_json, read_json};
use crate::locks::{LockGuard, LockOptions, acquire_lock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Tuning for the file engine's table locks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEngineOptions {
    pub lock: LockOptions,
}

/// Engine persisting tables under a root directory.
#[derive(Debug, Clone)]
pub struct FileEngine {
    root: PathBuf,
    options: FileEngineOptions,
}

/// Contents of `table.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableFile {
    name: String,
    partition_key: String,
    sort_key: String,
    status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ttl_attribute: Option<String>,
    created_at: DateTime<Utc>,
}

impl TableFile {
    fn description(&self) -> TableDescription {
        TableDescription {
            name: self.name.clone(),
            status: TableStatus::parse(&self.status),
            ttl_attribute: self.ttl_attribute.clone(),
        }
    }
}

/// Contents of a transaction journal.
#[derive(Debug, Serialize, Deserialize)]
struct Journal {
    token: String,
    writes: Vec<JournalWrite>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JournalWrite {
    key: Key,
    item: Item,
}

impl FileEngine {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self::with_options(root, FileEngineOptions::default())
    }

    pub fn with_options<P: Into<PathBuf>>(root: P, options: FileEngineOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Delete expired items and old idempotency markers from a table.
    ///
    /// Returns the number of items removed. Does nothing to items when TTL
    /// is not enabled on the table.
    pub fn purge_expired(&self, table: &str) -> EngineResult<usize> {
        let (_guard, meta) = self.locked_table(table, "purge")?;

        let mut removed = 0;
        if let Some(ttl_attribute) = meta.ttl_attribute.as_deref() {
            let now = Utc::now().timestamp();
            for path in self.all_item_paths(table)? {
                if let Some(item) = read_json::<_, Item>(&path)?
                    && is_expired(&item, Some(ttl_attribute), now)
                {
                    remove_if_present(&path)?;
                    removed += 1;
                }
            }
        }

        self.prune_markers(table)?;
        tracing::info!(table, removed, "purged expired items");
        Ok(removed)
    }

    fn table_dir(&self, table: &str) -> EngineResult<PathBuf> {
        let valid = (3..=255).contains(&table.len())
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !table.starts_with('.');
        if !valid {
            return Err(EngineError::Validation(format!(
                "invalid table name '{}'",
                table
            )));
        }
        Ok(self.root.join(table))
    }

    fn table_file(&self, table: &str) -> EngineResult<PathBuf> {
        Ok(self.table_dir(table)?.join("table.json"))
    }

    fn txn_dir(&self, table: &str) -> PathBuf {
        self.root.join(table).join("txn")
    }

    fn partition_dir(&self, table: &str, partition: &str) -> PathBuf {
        let encoded: String = partition.bytes().map(|b| format!("{:02x}", b)).collect();
        self.root.join(table).join("items").join(encoded)
    }

    fn item_path(&self, table: &str, key: &Key) -> PathBuf {
        self.partition_dir(table, &key.partition)
            .join(format!("{}.json", key.sort))
    }

    fn read_table(&self, table: &str) -> EngineResult<TableFile> {
        read_json(self.table_file(table)?)?
            .ok_or_else(|| EngineError::ResourceNotFound(format!("table '{}' not found", table)))
    }

    fn active_table(&self, table: &str) -> EngineResult<TableFile> {
        let meta = self.read_table(table)?;
        if !TableStatus::parse(&meta.status).accepts_requests() {
            return Err(EngineError::ResourceNotFound(format!(
                "table '{}' is {}",
                table, meta.status
            )));
        }
        Ok(meta)
    }

    /// Take the table lock and finish any interrupted transaction.
    fn lock_table(&self, table: &str, action: &str) -> EngineResult<LockGuard> {
        let lock_path = self.table_dir(table)?.join("table.lock");
        let guard = acquire_lock(&lock_path, action, &self.options.lock)?;
        self.recover(table)?;
        Ok(guard)
    }

    /// Remove committed-token markers older than the idempotency window.
    fn prune_markers(&self, table: &str) -> EngineResult<()> {
        for entry in list_dir(&self.txn_dir(table))? {
            let is_marker = entry.extension().is_some_and(|ext| ext == "committed");
            let old = fs::metadata(&entry)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age.as_secs() > IDEMPOTENCY_WINDOW_SECS);
            if is_marker && old {
                remove_if_present(&entry)?;
            }
        }
        Ok(())
    }

    /// Take the table lock, then read the table description under it.
    fn locked_table(&self, table: &str, action: &str) -> EngineResult<(LockGuard, TableFile)> {
        // A missing table must not get a lock directory.
        self.read_table(table)?;
        let guard = self.lock_table(table, action)?;
        let meta = self.active_table(table)?;
        Ok((guard, meta))
    }

    fn recover(&self, table: &str) -> EngineResult<()> {
        for path in list_dir(&self.txn_dir(table))? {
            let pending = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".pending.json"));
            if !pending {
                continue;
            }
            if let Some(journal) = read_json::<_, Journal>(&path)? {
                tracing::warn!(table, token = %journal.token, "replaying interrupted transaction");
                self.apply(table, &journal)?;
            }
        }
        Ok(())
    }

    fn apply(&self, table: &str, journal: &Journal) -> EngineResult<()> {
        for write in &journal.writes {
            atomic_write_json(self.item_path(table, &write.key), &write.item)?;
        }
        let txn_dir = self.txn_dir(table);
        let pending = txn_dir.join(format!("{}.pending.json", journal.token));
        let committed = txn_dir.join(format!("{}.committed", journal.token));
        fs::rename(&pending, &committed).map_err(|e| {
            EngineError::Io(format!(
                "failed to mark transaction '{}' committed: {}",
                journal.token, e
            ))
        })
    }

    fn live_item(&self, table: &str, meta: &TableFile, key: &Key, now: i64) -> EngineResult<Option<Item>> {
        let item: Option<Item> = read_json(self.item_path(table, key))?;
        Ok(item.filter(|item| !is_expired(item, meta.ttl_attribute.as_deref(), now)))
    }

    fn all_item_paths(&self, table: &str) -> EngineResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for partition in list_dir(&self.root.join(table).join("items"))? {
            paths.extend(item_files(&partition)?);
        }
        Ok(paths)
    }

    /// Plan and apply a single-table transaction under the table lock.
    fn commit(&self, members: &[TransactWriteItem], token: &str) -> EngineResult<()> {
        let table = single_table(members)?;
        validate_token(token)?;

        let (_guard, meta) = self.locked_table(table, "transact")?;

        let txn_dir = self.txn_dir(table);
        if txn_dir.join(format!("{}.committed", token)).exists() {
            tracing::debug!(table, token, "transaction token already committed");
            return Ok(());
        }

        let now = Utc::now().timestamp();
        let writes = plan_transaction(members, |t, key| self.live_item(t, &meta, key, now))?;

        let journal = Journal {
            token: token.to_string(),
            writes: writes
                .into_iter()
                .map(|PlannedWrite { key, item, .. }| JournalWrite { key, item })
                .collect(),
        };
        atomic_write_json(txn_dir.join(format!("{}.pending.json", token)), &journal)?;
        self.apply(table, &journal)?;
        self.prune_markers(table)
    }
}

impl Engine for FileEngine {
    fn transact_write(&self, request: TransactWriteRequest) -> EngineResult<()> {
        self.commit(&request.items, &request.client_request_token)
    }

    fn update_item(&self, update: Update) -> EngineResult<()> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.commit(&[TransactWriteItem::Update(update)], &token)
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
        consistency: Consistency,
    ) -> EngineResult<Option<Item>> {
        let (_guard, meta) = match consistency {
            Consistency::Strong => {
                let (guard, meta) = self.locked_table(table, "read")?;
                (Some(guard), meta)
            }
            Consistency::Eventual => (None, self.active_table(table)?),
        };
        let item = self.live_item(table, &meta, key, Utc::now().timestamp())?;
        Ok(item.map(|item| project(item, projection)))
    }

    fn query(
        &self,
        table: &str,
        partition: &str,
        consistency: Consistency,
    ) -> EngineResult<Vec<Item>> {
        let (_guard, meta) = match consistency {
            Consistency::Strong => {
                let (guard, meta) = self.locked_table(table, "query")?;
                (Some(guard), meta)
            }
            Consistency::Eventual => (None, self.active_table(table)?),
        };

        let now = Utc::now().timestamp();
        let mut items = Vec::new();
        for path in item_files(&self.partition_dir(table, partition))? {
            if let Some(item) = read_json::<_, Item>(&path)?
                && !is_expired(&item, meta.ttl_attribute.as_deref(), now)
            {
                items.push(item);
            }
        }
        items.sort_by_key(|item| Key::from_item(item).map(|k| k.sort));
        Ok(items)
    }

    fn describe_table(&self, table: &str) -> EngineResult<TableDescription> {
        Ok(self.read_table(table)?.description())
    }

    fn create_table(&self, schema: &TableSchema) -> EngineResult<()> {
        let table_file = self.table_file(&schema.name)?;
        let _guard = self.lock_table(&schema.name, "create")?;
        if table_file.exists() {
            return Err(EngineError::ResourceInUse(format!(
                "table '{}' already exists",
                schema.name
            )));
        }

        let meta = TableFile {
            name: schema.name.clone(),
            partition_key: schema.partition_key.clone(),
            sort_key: schema.sort_key.clone(),
            status: TableStatus::Active.to_string(),
            ttl_attribute: None,
            created_at: Utc::now(),
        };
        atomic_write_json(&table_file, &meta)?;
        tracing::info!(table = %schema.name, root = %self.root.display(), "created table");
        Ok(())
    }

    fn update_time_to_live(
        &self,
        table: &str,
        attribute: &str,
        enabled: bool,
    ) -> EngineResult<()> {
        let _guard = self.lock_table(table, "update_ttl")?;
        let mut meta = self.active_table(table)?;
        meta.ttl_attribute = enabled.then(|| attribute.to_string());
        atomic_write_json(self.table_file(table)?, &meta)
    }
}

fn single_table(members: &[TransactWriteItem]) -> EngineResult<&str> {
    let first = members
        .first()
        .map(TransactWriteItem::table)
        .ok_or_else(|| {
            EngineError::Validation("transaction must contain at least one item".to_string())
        })?;
    if members.iter().any(|m| m.table() != first) {
        return Err(EngineError::Validation(
            "file engine transactions must target a single table".to_string(),
        ));
    }
    Ok(first)
}

fn validate_token(token: &str) -> EngineResult<()> {
    let valid = !token.is_empty()
        && token.len() <= 64
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "invalid client request token '{}'",
            token
        )))
    }
}

/// Entries of a directory; empty if it does not exist.
fn list_dir(dir: &Path) -> EngineResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(EngineError::Io(format!(
                "failed to read directory '{}': {}",
                dir.display(),
                e
            )));
        }
    };

    entries
        .map(|entry| {
            entry.map(|e| e.path()).map_err(|e| {
                EngineError::Io(format!(
                    "failed to read directory entry in '{}': {}",
                    dir.display(),
                    e
                ))
            })
        })
        .collect()
}

/// Item files in a partition directory, skipping leftover temp files.
fn item_files(partition_dir: &Path) -> EngineResult<Vec<PathBuf>> {
    Ok(list_dir(partition_dir)?
        .into_iter()
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            !name.starts_with('.') && name.ends_with(".json")
        })
        .collect())
}

fn remove_if_present(path: &Path) -> EngineResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EngineError::Io(format!(
            "failed to remove '{}': {}",
            path.display(),
            e
        ))),
    }
}
