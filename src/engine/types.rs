//! Value types shared by every engine implementation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored document: top-level attribute name to JSON value.
pub type Item = serde_json::Map<String, Value>;

/// Name of the partition key attribute.
pub const PARTITION_KEY: &str = "entity";

/// Name of the sort key attribute.
pub const SORT_KEY: &str = "revision";

/// Primary key of an item: partition plus numeric sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    pub partition: String,
    pub sort: i64,
}

impl Key {
    pub fn new(partition: impl Into<String>, sort: i64) -> Self {
        Self {
            partition: partition.into(),
            sort,
        }
    }

    /// Extract the primary key from an item, if both key attributes are present
    /// with the right types.
    pub fn from_item(item: &Item) -> Option<Self> {
        let partition = item.get(PARTITION_KEY)?.as_str()?;
        let sort = item.get(SORT_KEY)?.as_i64()?;
        Some(Self::new(partition, sort))
    }

    /// The key as an item containing only the key attributes.
    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert(
            PARTITION_KEY.to_string(),
            Value::String(self.partition.clone()),
        );
        item.insert(SORT_KEY.to_string(), Value::from(self.sort));
        item
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.partition, self.sort)
    }
}

/// Read consistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Consistency {
    /// Cheaper read that may miss the latest committed write.
    #[default]
    Eventual,
    /// Read that reflects every write committed before it started.
    Strong,
}

/// Predicate evaluated by the engine against the existing item.
///
/// Paths are dotted (`summary.locked`). A missing attribute never equals
/// anything, so `NotEquals` holds for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    AttributeNotExists(String),
    AttributeExists(String),
    Equals(String, Value),
    NotEquals(String, Value),
    And(Vec<Condition>),
}

impl Condition {
    pub fn not_exists(path: &str) -> Self {
        Condition::AttributeNotExists(path.to_string())
    }

    pub fn equals(path: &str, value: impl Into<Value>) -> Self {
        Condition::Equals(path.to_string(), value.into())
    }

    pub fn not_equals(path: &str, value: impl Into<Value>) -> Self {
        Condition::NotEquals(path.to_string(), value.into())
    }

    /// Combine with another condition; both must hold.
    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut all) => {
                all.push(other);
                Condition::And(all)
            }
            first => Condition::And(vec![first, other]),
        }
    }
}

/// A single mutation applied by an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UpdateAction {
    Set(String, Value),
    Remove(String),
}

/// Insert or replace a whole item.
#[derive(Debug, Clone, PartialEq)]
pub struct Put {
    pub table: String,
    pub item: Item,
    pub condition: Option<Condition>,
}

/// Modify attributes of an item in place (created if absent).
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub key: Key,
    pub condition: Option<Condition>,
    pub actions: Vec<UpdateAction>,
}

/// One member of a transactional write.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactWriteItem {
    Put(Put),
    Update(Update),
}

impl TransactWriteItem {
    pub fn table(&self) -> &str {
        match self {
            TransactWriteItem::Put(put) => &put.table,
            TransactWriteItem::Update(update) => &update.table,
        }
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            TransactWriteItem::Put(put) => put.condition.as_ref(),
            TransactWriteItem::Update(update) => update.condition.as_ref(),
        }
    }
}

/// An all-or-nothing group of writes.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactWriteRequest {
    pub items: Vec<TransactWriteItem>,

    /// Idempotency token: replaying a committed token is a successful no-op.
    pub client_request_token: String,
}

/// Why an individual transaction member was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancellationReason {
    /// This member was fine; another member failed.
    None,
    /// This member's condition did not hold.
    ConditionalCheckFailed,
}

impl std::fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancellationReason::None => write!(f, "None"),
            CancellationReason::ConditionalCheckFailed => write!(f, "ConditionalCheckFailed"),
        }
    }
}

/// Lifecycle status of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    /// Any status this crate does not know how to handle.
    Other(String),
}

impl TableStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TableStatus::Creating => "CREATING",
            TableStatus::Active => "ACTIVE",
            TableStatus::Updating => "UPDATING",
            TableStatus::Deleting => "DELETING",
            TableStatus::Other(status) => status,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "CREATING" => TableStatus::Creating,
            "ACTIVE" => TableStatus::Active,
            "UPDATING" => TableStatus::Updating,
            "DELETING" => TableStatus::Deleting,
            other => TableStatus::Other(other.to_string()),
        }
    }

    /// Whether item reads and writes are accepted.
    pub fn accepts_requests(&self) -> bool {
        matches!(self, TableStatus::Active | TableStatus::Updating)
    }
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key schema for a new table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub partition_key: String,
    pub sort_key: String,
}

impl TableSchema {
    /// Schema used for mutex tables: string `entity` partition, numeric
    /// `revision` sort key.
    pub fn entity_revision(name: &str) -> Self {
        Self {
            name: name.to_string(),
            partition_key: PARTITION_KEY.to_string(),
            sort_key: SORT_KEY.to_string(),
        }
    }
}

/// Result of describing a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    pub name: String,
    pub status: TableStatus,
    /// Attribute holding item expiry (unix seconds), when TTL is enabled.
    pub ttl_attribute: Option<String>,
}
