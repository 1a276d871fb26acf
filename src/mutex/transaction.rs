//! Builder for the all-or-nothing writes issued by the store.

use crate::engine::{
    Condition, Engine, EngineResult, Item, Key, Put, TransactWriteItem, TransactWriteRequest,
    Update, UpdateAction,
};
use uuid::Uuid;

/// Members of one transaction against a single table.
#[derive(Debug, Clone)]
pub struct WriteTransaction {
    table: String,
    items: Vec<TransactWriteItem>,
}

impl WriteTransaction {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            items: Vec::new(),
        }
    }

    pub fn put(mut self, item: Item, condition: Condition) -> Self {
        self.items.push(TransactWriteItem::Put(Put {
            table: self.table.clone(),
            item,
            condition: Some(condition),
        }));
        self
    }

    pub fn update(mut self, key: Key, condition: Condition, actions: Vec<UpdateAction>) -> Self {
        self.items.push(TransactWriteItem::Update(Update {
            table: self.table.clone(),
            key,
            condition: Some(condition),
            actions,
        }));
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Finish the transaction with a fresh client request token.
    pub fn into_request(self) -> TransactWriteRequest {
        TransactWriteRequest {
            items: self.items,
            client_request_token: Uuid::new_v4().to_string(),
        }
    }

    pub fn execute<E: Engine + ?Sized>(self, engine: &E) -> EngineResult<()> {
        engine.transact_write(self.into_request())
    }
}
