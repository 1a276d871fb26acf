//! Transactional mutex store.
//!
//! Each transition is one engine transaction holding two members: a
//! conditional write of the current-state row and a conditional insert of
//! the audit event for the new version. Either both land or neither does.
//!
//! Lock and unlock read the current version first and condition the update
//! on both the lock flag and that version. When the condition fails the
//! store reads again to report what actually happened: the mutex was already
//! in the target state, it disappeared, or another transition slipped in
//! between the read and the write (`Conflict`).

use super::entity::{
    CURRENT_REVISION, MutexRecord, MutexView, VIEW_PROJECTION, current_key, mutex_entity_id,
    validate_mutex_name,
};
use super::transaction::WriteTransaction;
use super::MutexRepository;
use crate::context::RequestContext;
use crate::engine::{Condition, Consistency, Engine, EngineError, UpdateAction};
use crate::error::{LatchkeyError, Result};
use crate::events::{DEFAULT_RETENTION_DAYS, Event, EventType};
use serde_json::Value;
use tracing::{debug, info};

/// Member index of the current-state write in every transition.
const STATE_MEMBER: usize = 0;
/// Member index of the event insert in every transition.
const EVENT_MEMBER: usize = 1;

/// Mutex store over a backing engine table.
#[derive(Debug)]
pub struct MutexStore<E> {
    engine: E,
    table: String,
    retention_days: u32,
}

impl<E: Engine> MutexStore<E> {
    pub fn new(engine: E, table: impl Into<String>) -> Self {
        Self {
            engine,
            table: table.into(),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }

    /// Keep audit events for `days` instead of the default 30.
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create an unlocked mutex at version 1.
    ///
    /// Fails with `AlreadyExists` if the name is taken; nothing is written in
    /// that case.
    pub fn create(&self, ctx: &RequestContext, name: &str, description: &str) -> Result<()> {
        validate_mutex_name(name)?;
        let entity = mutex_entity_id(name);
        let record = MutexRecord::new(name, description);
        let event = Event::new(&entity, record.version, EventType::MutexCreated, ctx)
            .with_retention_days(self.retention_days)
            .with_data("description", description);

        let result = WriteTransaction::new(&self.table)
            .put(record.to_item()?, Condition::not_exists("entity"))
            .put(event.to_item()?, Condition::not_exists("revision"))
            .execute(&self.engine);

        match result {
            Ok(()) => {
                info!(mutex = name, "mutex created");
                Ok(())
            }
            Err(e) if e.condition_failed_at(STATE_MEMBER) => {
                Err(LatchkeyError::AlreadyExists(name.to_string()))
            }
            Err(e) if e.condition_failed_at(EVENT_MEMBER) => Err(LatchkeyError::Conflict {
                name: name.to_string(),
                detail: format!("event revision {} already exists", record.version),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Lock the mutex for the effective user, recording `message`.
    pub fn lock(&self, ctx: &RequestContext, name: &str, message: &str) -> Result<()> {
        self.transition(ctx, name, true, message)
    }

    /// Release the mutex. A non-empty `message` is recorded on the event.
    pub fn unlock(&self, ctx: &RequestContext, name: &str, message: &str) -> Result<()> {
        self.transition(ctx, name, false, message)
    }

    /// Read the lock state of a mutex.
    pub fn get(&self, name: &str, consistency: Consistency) -> Result<MutexView> {
        validate_mutex_name(name)?;
        let item = self
            .engine
            .get_item(
                &self.table,
                &current_key(name),
                Some(VIEW_PROJECTION),
                consistency,
            )?
            .ok_or_else(|| LatchkeyError::NotFound(name.to_string()))?;
        MutexView::from_item(name, &item)
    }

    /// Audit events of a mutex that have not expired, oldest first.
    pub fn history(&self, name: &str) -> Result<Vec<Event>> {
        validate_mutex_name(name)?;
        let items = self
            .engine
            .query(&self.table, &mutex_entity_id(name), Consistency::Strong)?;

        let mut found = false;
        let mut events = Vec::new();
        for item in items {
            let revision = item.get("revision").and_then(Value::as_i64);
            match revision {
                Some(CURRENT_REVISION) => found = true,
                Some(_) => events.push(Event::from_item(item)?),
                None => {
                    return Err(LatchkeyError::Storage(format!(
                        "item without revision in mutex '{}'",
                        name
                    )));
                }
            }
        }

        if !found {
            return Err(LatchkeyError::NotFound(name.to_string()));
        }
        Ok(events)
    }

    fn transition(
        &self,
        ctx: &RequestContext,
        name: &str,
        lock: bool,
        message: &str,
    ) -> Result<()> {
        let current = self.get(name, Consistency::Strong)?;
        let next = current.version + 1;
        let entity = mutex_entity_id(name);

        let condition = Condition::not_equals("summary.locked", lock)
            .and(Condition::equals("version", current.version));

        let mut actions = vec![UpdateAction::Set("summary.locked".into(), Value::Bool(lock))];
        let event = if lock {
            actions.push(UpdateAction::Set(
                "summary.locked_by".into(),
                Value::from(ctx.effective_user.name.clone()),
            ));
            actions.push(UpdateAction::Set(
                "summary.message".into(),
                Value::from(message),
            ));
            Event::new(&entity, next, EventType::MutexLocked, ctx).with_data("message", message)
        } else {
            actions.push(UpdateAction::Remove("summary.locked_by".into()));
            actions.push(UpdateAction::Remove("summary.message".into()));
            let event = Event::new(&entity, next, EventType::MutexUnlocked, ctx);
            if message.is_empty() {
                event
            } else {
                event.with_data("message", message)
            }
        };
        actions.push(UpdateAction::Set("version".into(), Value::from(next)));
        let event = event.with_retention_days(self.retention_days);

        debug!(mutex = name, lock, version = current.version, "attempting transition");

        let result = WriteTransaction::new(&self.table)
            .update(current_key(name), condition, actions)
            .put(event.to_item()?, Condition::not_exists("revision"))
            .execute(&self.engine);

        match result {
            Ok(()) => {
                info!(
                    mutex = name,
                    version = next,
                    "{}",
                    if lock { "mutex locked" } else { "mutex unlocked" }
                );
                Ok(())
            }
            Err(e) => Err(self.classify_failure(name, lock, current.version, next, e)),
        }
    }

    /// Turn a failed transition into the error the caller should see.
    fn classify_failure(
        &self,
        name: &str,
        lock: bool,
        read_version: i64,
        next: i64,
        err: EngineError,
    ) -> LatchkeyError {
        if err.condition_failed_at(STATE_MEMBER) {
            return match self.get(name, Consistency::Strong) {
                Ok(view) if view.locked == lock => {
                    if lock {
                        LatchkeyError::AlreadyLocked(name.to_string())
                    } else {
                        LatchkeyError::AlreadyUnlocked(name.to_string())
                    }
                }
                Ok(view) => LatchkeyError::Conflict {
                    name: name.to_string(),
                    detail: format!(
                        "version moved from {} to {} before the write",
                        read_version, view.version
                    ),
                },
                Err(e) => e,
            };
        }
        if err.condition_failed_at(EVENT_MEMBER) {
            return LatchkeyError::Conflict {
                name: name.to_string(),
                detail: format!("event revision {} already exists", next),
            };
        }
        err.into()
    }
}

impl<E: Engine> MutexRepository for MutexStore<E> {
    fn create(&self, ctx: &RequestContext, name: &str, description: &str) -> Result<()> {
        MutexStore::create(self, ctx, name, description)
    }

    fn lock(&self, ctx: &RequestContext, name: &str, message: &str) -> Result<()> {
        MutexStore::lock(self, ctx, name, message)
    }

    fn unlock(&self, ctx: &RequestContext, name: &str, message: &str) -> Result<()> {
        MutexStore::unlock(self, ctx, name, message)
    }
}
