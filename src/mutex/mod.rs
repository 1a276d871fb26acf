//! Named mutexes persisted in a backing engine.
//!
//! # Module Structure
//!
//! - [`entity`]: current-state row, read view, name rules
//! - [`transaction`]: builder for the two-member transition writes
//! - [`store`]: [`MutexStore`], one conditional transaction per transition
//! - [`manager`]: [`LockManager`] and its [`RetrySchedule`]
//!
//! A mutex moves `created (unlocked) -> locked -> unlocked -> ...` forever.
//! Every transition bumps `version` by one and appends an audit event whose
//! revision is the new version.

pub mod entity;
pub mod manager;
pub mod store;
pub mod transaction;


pub use entity::{MutexRecord, MutexView, Summary, mutex_entity_id, validate_mutex_name};
pub use manager::{DEFAULT_RETRY_DELAYS_SECS, LockManager, RetrySchedule};
pub use store::MutexStore;
pub use transaction::WriteTransaction;

use crate::context::RequestContext;
use crate::error::Result;
use std::sync::Arc;

/// Single-attempt mutex transitions, as consumed by [`LockManager`].
pub trait MutexRepository: Send + Sync {
    fn create(&self, ctx: &RequestContext, name: &str, description: &str) -> Result<()>;

    fn lock(&self, ctx: &RequestContext, name: &str, message: &str) -> Result<()>;

    fn unlock(&self, ctx: &RequestContext, name: &str, message: &str) -> Result<()>;
}

impl<R: MutexRepository + ?Sized> MutexRepository for &R {
    fn create(&self, ctx: &RequestContext, name: &str, description: &str) -> Result<()> {
        (**self).create(ctx, name, description)
    }

    fn lock(&self, ctx: &RequestContext, name: &str, message: &str) -> Result<()> {
        (**self).lock(ctx, name, message)
    }

    fn unlock(&self, ctx: &RequestContext, name: &str, message: &str) -> Result<()> {
        (**self).unlock(ctx, name, message)
    }
}

impl<R: MutexRepository + ?Sized> MutexRepository for Arc<R> {
    fn create(&self, ctx: &RequestContext, name: &str, description: &str) -> Result<()> {
        (**self).create(ctx, name, description)
    }

    fn lock(&self, ctx: &RequestContext, name: &str, message: &str) -> Result<()> {
        (**self).lock(ctx, name, message)
    }

    fn unlock(&self, ctx: &RequestContext, name: &str, message: &str) -> Result<()> {
        (**self).unlock(ctx, name, message)
    }
}
