//! Persisted shape of a mutex: the current-state row and its read view.

use crate::engine::{Item, Key};
use crate::error::{LatchkeyError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// Prefix namespacing mutex entities within a shared table.
pub const ENTITY_PREFIX: &str = "mutex:";

/// Sort key of the current-state row; events use revisions from 1 up.
pub const CURRENT_REVISION: i64 = 0;

/// Value of `entity_type` on current-state rows.
pub const ENTITY_TYPE: &str = "mutex";

/// Attributes read when only the lock state is needed.
pub const VIEW_PROJECTION: &[&str] = &["version", "summary"];

/// Regex pattern for valid mutex names.
static MUTEX_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,127}$").expect("Invalid mutex name regex")
});

/// Reject names that cannot be used as a mutex identity.
pub fn validate_mutex_name(name: &str) -> Result<()> {
    if MUTEX_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(LatchkeyError::UserError(format!(
            "invalid mutex name '{}': use 1-128 letters, digits, '.', '_' or '-', starting with a letter or digit",
            name
        )))
    }
}

/// Entity id shared by a mutex's current-state row and its events.
pub fn mutex_entity_id(name: &str) -> String {
    format!("{}{}", ENTITY_PREFIX, name)
}

/// Key of a mutex's current-state row.
pub fn current_key(name: &str) -> Key {
    Key::new(mutex_entity_id(name), CURRENT_REVISION)
}

/// The mutable part of a mutex that decides lock and unlock legality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub locked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Current-state row of a mutex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutexRecord {
    pub entity: String,
    pub revision: i64,
    pub entity_type: String,
    pub version: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub summary: Summary,
}

impl MutexRecord {
    /// A freshly created, unlocked mutex at version 1.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            entity: mutex_entity_id(name),
            revision: CURRENT_REVISION,
            entity_type: ENTITY_TYPE.to_string(),
            version: 1,
            description: description.to_string(),
            summary: Summary::default(),
        }
    }

    pub fn to_item(&self) -> Result<Item> {
        match serde_json::to_value(self) {
            Ok(Value::Object(item)) => Ok(item),
            Ok(other) => Err(LatchkeyError::Storage(format!(
                "mutex record serialized to a non-object: {}",
                other
            ))),
            Err(e) => Err(LatchkeyError::Storage(format!(
                "failed to serialize mutex record: {}",
                e
            ))),
        }
    }
}

/// What a status read reports about a mutex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutexView {
    pub version: i64,
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MutexView {
    /// Decode from an item carrying at least `version` and `summary`.
    pub fn from_item(name: &str, item: &Item) -> Result<Self> {
        let version = item
            .get("version")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                LatchkeyError::Storage(format!("mutex '{}' has no numeric version", name))
            })?;

        let summary: Summary = match item.get("summary") {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                LatchkeyError::Storage(format!("mutex '{}' has a bad summary: {}", name, e))
            })?,
            None => Summary::default(),
        };

        Ok(Self {
            version,
            locked: summary.locked,
            locked_by: summary.locked_by,
            message: summary.message,
        })
    }
}
