//! Server-side evaluation shared by engine implementations: condition
//! checks, update actions, projections, expiry, and transaction planning.

use super::error::{EngineError, EngineResult};
use super::types::{
    CancellationReason, Condition, Item, Key, TransactWriteItem, UpdateAction,
};
use serde_json::Value;
use std::collections::BTreeSet;

/// Look up a dotted path inside an item.
pub fn resolve<'a>(item: &'a Item, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = item.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Set a dotted path, creating intermediate maps as needed.
pub fn set_path(item: &mut Item, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut current = item;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Item::new()));
        if !entry.is_object() {
            *entry = Value::Object(Item::new());
        }
        current = match entry.as_object_mut() {
            Some(map) => map,
            None => return,
        };
    }
    current.insert(last.to_string(), value);
}

/// Remove a dotted path if present.
pub fn remove_path(item: &mut Item, path: &str) {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut current = item;
    for segment in parents {
        current = match current.get_mut(*segment).and_then(Value::as_object_mut) {
            Some(map) => map,
            None => return,
        };
    }
    current.remove(*last);
}

impl Condition {
    /// Evaluate against the existing item (`None` when the key is absent).
    pub fn evaluate(&self, existing: Option<&Item>) -> bool {
        let lookup = |path: &str| existing.and_then(|item| resolve(item, path));
        match self {
            Condition::AttributeNotExists(path) => lookup(path).is_none(),
            Condition::AttributeExists(path) => lookup(path).is_some(),
            Condition::Equals(path, value) => lookup(path) == Some(value),
            Condition::NotEquals(path, value) => lookup(path) != Some(value),
            Condition::And(all) => all.iter().all(|c| c.evaluate(existing)),
        }
    }
}

/// Apply update actions to an item in place.
pub fn apply_actions(item: &mut Item, actions: &[UpdateAction]) {
    for action in actions {
        match action {
            UpdateAction::Set(path, value) => set_path(item, path, value.clone()),
            UpdateAction::Remove(path) => remove_path(item, path),
        }
    }
}

/// Keep only the requested top-level attributes.
pub fn project(item: Item, projection: Option<&[&str]>) -> Item {
    match projection {
        None => item,
        Some(names) => item
            .into_iter()
            .filter(|(name, _)| names.contains(&name.as_str()))
            .collect(),
    }
}

/// Whether an item's TTL attribute (unix seconds) lies before `now`.
pub fn is_expired(item: &Item, ttl_attribute: Option<&str>, now: i64) -> bool {
    ttl_attribute
        .and_then(|attr| item.get(attr))
        .and_then(Value::as_i64)
        .is_some_and(|expires| expires < now)
}

/// A write produced by planning a transaction: final item state per key.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWrite {
    pub table: String,
    pub key: Key,
    pub item: Item,
}

/// Validate a transaction, evaluate every condition against current state,
/// and compute the resulting items.
///
/// `lookup` returns the current (non-expired) item for a table/key. Nothing
/// is written here; the caller applies the plan only when this returns `Ok`.
pub fn plan_transaction<F>(items: &[TransactWriteItem], mut lookup: F) -> EngineResult<Vec<PlannedWrite>>
where
    F: FnMut(&str, &Key) -> EngineResult<Option<Item>>,
{
    if items.is_empty() {
        return Err(EngineError::Validation(
            "transaction must contain at least one item".to_string(),
        ));
    }

    let mut seen = BTreeSet::new();
    let mut reasons = Vec::with_capacity(items.len());
    let mut writes = Vec::with_capacity(items.len());
    let mut failed = false;

    for member in items {
        let key = match member {
            TransactWriteItem::Put(put) => Key::from_item(&put.item).ok_or_else(|| {
                EngineError::Validation("put item is missing its key attributes".to_string())
            })?,
            TransactWriteItem::Update(update) => update.key.clone(),
        };

        if !seen.insert((member.table().to_string(), key.clone())) {
            return Err(EngineError::Validation(format!(
                "transaction touches item {} more than once",
                key
            )));
        }

        let existing = lookup(member.table(), &key)?;
        let holds = member
            .condition()
            .is_none_or(|c| c.evaluate(existing.as_ref()));
        if !holds {
            failed = true;
            reasons.push(CancellationReason::ConditionalCheckFailed);
            continue;
        }
        reasons.push(CancellationReason::None);

        let item = match member {
            TransactWriteItem::Put(put) => put.item.clone(),
            TransactWriteItem::Update(update) => {
                let mut item = existing.unwrap_or_else(|| key.to_item());
                apply_actions(&mut item, &update.actions);
                item
            }
        };
        writes.push(PlannedWrite {
            table: member.table().to_string(),
            key,
            item,
        });
    }

    if failed {
        return Err(EngineError::TransactionCanceled { reasons });
    }
    Ok(writes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Put, Update};
    use serde_json::json;

    fn item(value: Value) -> Item {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn resolves_nested_paths() {
        let doc = item(json!({"summary": {"locked": true, "locked_by": "ada"}}));
        assert_eq!(resolve(&doc, "summary.locked"), Some(&json!(true)));
        assert_eq!(resolve(&doc, "summary.message"), None);
        assert_eq!(resolve(&doc, "version"), None);
    }

    #[test]
    fn not_equals_holds_for_missing_attribute() {
        let doc = item(json!({"summary": {}}));
        assert!(Condition::not_equals("summary.locked", true).evaluate(Some(&doc)));
        assert!(Condition::not_equals("summary.locked", true).evaluate(None));
        assert!(!Condition::equals("version", 1).evaluate(Some(&doc)));
    }

    #[test]
    fn and_requires_every_condition() {
        let doc = item(json!({"version": 2, "summary": {"locked": false}}));
        let cond = Condition::not_equals("summary.locked", true).and(Condition::equals("version", 2));
        assert!(cond.evaluate(Some(&doc)));

        let cond = Condition::not_equals("summary.locked", true).and(Condition::equals("version", 1));
        assert!(!cond.evaluate(Some(&doc)));
    }

    #[test]
    fn set_and_remove_nested_paths() {
        let mut doc = item(json!({"summary": {"locked": false}}));
        apply_actions(
            &mut doc,
            &[
                UpdateAction::Set("summary.locked".into(), json!(true)),
                UpdateAction::Set("summary.message".into(), json!("deploying")),
                UpdateAction::Set("version".into(), json!(2)),
            ],
        );
        assert_eq!(
            Value::Object(doc.clone()),
            json!({"summary": {"locked": true, "message": "deploying"}, "version": 2})
        );

        apply_actions(&mut doc, &[UpdateAction::Remove("summary.message".into())]);
        assert_eq!(resolve(&doc, "summary.message"), None);
        // Removing something absent is a no-op
        apply_actions(&mut doc, &[UpdateAction::Remove("nope.deeper".into())]);
    }

    #[test]
    fn projection_keeps_requested_attributes() {
        let doc = item(json!({"entity": "m", "version": 3, "description": "x"}));
        let projected = project(doc, Some(&["version"]));
        assert_eq!(Value::Object(projected), json!({"version": 3}));
    }

    #[test]
    fn expiry_uses_ttl_attribute_when_enabled() {
        let doc = item(json!({"ttl": 100}));
        assert!(is_expired(&doc, Some("ttl"), 101));
        assert!(!is_expired(&doc, Some("ttl"), 100));
        assert!(!is_expired(&doc, None, 1_000));
    }

    #[test]
    fn plan_reports_reason_per_member() {
        let existing = item(json!({"entity": "a", "revision": 0}));
        let members = vec![
            TransactWriteItem::Put(Put {
                table: "t".into(),
                item: existing.clone(),
                condition: Some(Condition::not_exists("entity")),
            }),
            TransactWriteItem::Put(Put {
                table: "t".into(),
                item: item(json!({"entity": "a", "revision": 1})),
                condition: Some(Condition::not_exists("revision")),
            }),
        ];

        let err = plan_transaction(&members, |_, key| {
            Ok((key.sort == 0).then(|| existing.clone()))
        })
        .unwrap_err();

        assert_eq!(
            err,
            EngineError::TransactionCanceled {
                reasons: vec![
                    CancellationReason::ConditionalCheckFailed,
                    CancellationReason::None
                ]
            }
        );
        assert!(err.condition_failed_at(0));
        assert!(!err.condition_failed_at(1));
    }

    #[test]
    fn plan_rejects_duplicate_keys() {
        let key = Key::new("a", 0);
        let update = TransactWriteItem::Update(Update {
            table: "t".into(),
            key: key.clone(),
            condition: None,
            actions: vec![],
        });
        let err = plan_transaction(&[update.clone(), update], |_, _| Ok(None)).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn plan_update_creates_missing_item_from_key() {
        let update = TransactWriteItem::Update(Update {
            table: "t".into(),
            key: Key::new("a", 0),
            condition: None,
            actions: vec![UpdateAction::Set("version".into(), json!(1))],
        });
        let writes = plan_transaction(&[update], |_, _| Ok(None)).unwrap();
        assert_eq!(
            Value::Object(writes[0].item.clone()),
            json!({"entity": "a", "revision": 0, "version": 1})
        );
    }
}
