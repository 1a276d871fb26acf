//! Acting context for mutex operations.
//!
//! Every create/lock/unlock carries a [`RequestContext`] describing who is
//! acting (effective user), on whose behalf (real user), and through which
//! client. The store snapshots it into the audit event for the transition.
//! The context also carries the caller's [`CancelToken`].

use crate::cancel::CancelToken;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Environment variable naming the user an operation is performed for.
pub const REAL_USER_ENV: &str = "LATCHKEY_REAL_USER";

/// A person (or service account) involved in an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier, when the caller has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Ulid>,

    /// Display name; recorded as `locked_by` when this user locks a mutex.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            uid: None,
            name: name.into(),
            email: None,
        }
    }

    pub fn with_uid(mut self, uid: Ulid) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// The client through which a request arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Kind of client, e.g. `cli`.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }
}

/// Who is performing an operation, through what, and until when.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub client: ClientInfo,
    pub effective_user: User,
    pub real_user: User,
    pub cancel: CancelToken,
}

impl RequestContext {
    /// A context where `user` acts for themselves.
    pub fn new(client: ClientInfo, user: User) -> Self {
        Self {
            client,
            real_user: user.clone(),
            effective_user: user,
            cancel: CancelToken::new(),
        }
    }

    /// Record that the effective user acts on behalf of `real_user`.
    pub fn on_behalf_of(mut self, real_user: User) -> Self {
        self.real_user = real_user;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Build a context from the process environment.
    ///
    /// The effective user is `user@HOST`; `LATCHKEY_REAL_USER` overrides the
    /// real user.
    pub fn from_env(client_kind: &str) -> Self {
        Self::from_vars(client_kind, |name| std::env::var(name).ok())
    }

    /// Build a context from an arbitrary variable lookup.
    pub fn from_vars<F>(client_kind: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let effective = User::named(identity_from(&lookup));
        let ctx = Self::new(ClientInfo::of_kind(client_kind), effective);
        match lookup(REAL_USER_ENV).filter(|name| !name.trim().is_empty()) {
            Some(real) => ctx.on_behalf_of(User::named(real.trim())),
            None => ctx,
        }
    }
}

/// The local `user@HOST` identity string.
pub fn local_identity() -> String {
    identity_from(|name| std::env::var(name).ok())
}

fn identity_from<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let user = lookup("USER")
        .or_else(|| lookup("USERNAME"))
        .unwrap_or_else(|| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
