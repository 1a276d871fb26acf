//! Audit events for mutex transitions.
//!
//! Every successful create, lock, and unlock appends exactly one event row to
//! the mutex's partition, in the same transaction as the state change. Events
//! are immutable: the store writes them with a revision-not-exists condition
//! and never updates them afterwards.
//!
//! # Event Format
//!
//! Each event is stored as an engine item with the following attributes:
//! - `entity`: the mutex entity id (`mutex:<name>`)
//! - `revision`: the mutex version after the transition
//! - `created`: unix seconds when the transition happened
//! - `ttl`: unix seconds after which the engine may prune the event
//! - `client`, `euser`, `ruser`: snapshot of the acting context
//! - `type`: `mutex-created`, `mutex-locked`, or `mutex-unlocked`
//! - `data`: string map with transition-specific payload
//!
//! ```no_run
//! use latchkey::context::{ClientInfo, RequestContext, User};
//! use latchkey::events::{Event, EventType};
//!
//! let ctx = RequestContext::new(ClientInfo::of_kind("cli"), User::named("ada"));
//! let event = Event::new("mutex:deploy", 2, EventType::MutexLocked, &ctx)
//!     .with_data("message", "rolling out v42");
//! let item = event.to_item()?;
//! # Ok::<(), latchkey::error::LatchkeyError>(())
//! ```

use crate::context::{ClientInfo, RequestContext, User};
use crate::engine::Item;
use crate::error::{LatchkeyError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute the engine's expiry is enabled on.
pub const TTL_ATTRIBUTE: &str = "ttl";

/// How long events are kept unless configured otherwise.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Kinds of mutex transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    MutexCreated,
    MutexLocked,
    MutexUnlocked,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::MutexCreated => write!(f, "mutex-created"),
            EventType::MutexLocked => write!(f, "mutex-locked"),
            EventType::MutexUnlocked => write!(f, "mutex-unlocked"),
        }
    }
}

/// An audit record of one mutex transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub entity: String,

    pub revision: i64,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub created: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub ttl: DateTime<Utc>,

    #[serde(default)]
    pub client: ClientInfo,

    #[serde(default)]
    pub euser: User,

    #[serde(default)]
    pub ruser: User,

    #[serde(rename = "type")]
    pub event_type: EventType,

    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl Event {
    /// Create an event for `entity` at `revision`, stamped now and snapshotting
    /// the acting context.
    pub fn new(entity: &str, revision: i64, event_type: EventType, ctx: &RequestContext) -> Self {
        let created = Utc::now();
        Self {
            entity: entity.to_string(),
            revision,
            created,
            ttl: created + Duration::days(i64::from(DEFAULT_RETENTION_DAYS)),
            client: ctx.client.clone(),
            euser: ctx.effective_user.clone(),
            ruser: ctx.real_user.clone(),
            event_type,
            data: BTreeMap::new(),
        }
    }

    /// Keep the event for `days` after its creation.
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.ttl = self.created + Duration::days(i64::from(days));
        self
    }

    /// Add a payload entry. Empty values are still recorded.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Marshal into an engine item.
    pub fn to_item(&self) -> Result<Item> {
        match serde_json::to_value(self) {
            Ok(Value::Object(item)) => Ok(item),
            Ok(other) => Err(LatchkeyError::Storage(format!(
                "event serialized to a non-object: {}",
                other
            ))),
            Err(e) => Err(LatchkeyError::Storage(format!(
                "failed to serialize event: {}",
                e
            ))),
        }
    }

    /// Unmarshal from an engine item.
    pub fn from_item(item: Item) -> Result<Self> {
        serde_json::from_value(Value::Object(item))
            .map_err(|e| LatchkeyError::Storage(format!("failed to decode event: {}", e)))
    }
}
