use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::errors::SessionError;

/// Key/value content of a session
pub type SessionContent = serde_json::Map<String, Value>;

/// Content key holding the session-bound CSRF token
pub const CSRF_TOKEN_KEY: &str = "csrfToken";
/// Content key holding the identity reference of the logged-in user
pub const USER_ID_KEY: &str = "userId";

/// One authenticated (or anonymous-with-state) conversation.
///
/// A `Session` is a plain value: mutating it only flips `is_modified`. The
/// finalizer of the request decides whether it is written back to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: String,
    content: SessionContent,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    modified: bool,
    destroyed: bool,
}

impl Session {
    pub fn new(
        id: String,
        content: SessionContent,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            content,
            created_at,
            updated_at: created_at,
            expires_at,
            modified: false,
            destroyed: false,
        }
    }

    pub(crate) fn from_stored(id: String, stored: StoredSession) -> Self {
        Self {
            id,
            content: stored.content,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            expires_at: stored.expires_at,
            modified: false,
            destroyed: false,
        }
    }

    pub(crate) fn to_stored(&self) -> StoredSession {
        StoredSession {
            content: self.content.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            expires_at: self.expires_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &SessionContent {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// A session is invalid at or after its expiration instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.content.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.content.get(key).and_then(Value::as_str)
    }

    /// Sets `key` to `value` and marks the session as modified.
    ///
    /// The CSRF token is write-once: once present it cannot be replaced.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), SessionError> {
        let key = key.into();
        if self.destroyed {
            return Err(SessionError::Content(
                "Cannot modify a destroyed session".to_string(),
            ));
        }
        if key == CSRF_TOKEN_KEY && self.csrf_token().is_some() {
            return Err(SessionError::Content(
                "The CSRF token of a session cannot be replaced".to_string(),
            ));
        }
        self.content.insert(key, value.into());
        self.modified = true;
        Ok(())
    }

    /// Removes `key` from the content. The CSRF token is never removed.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if key == CSRF_TOKEN_KEY || self.destroyed {
            return None;
        }
        let removed = self.content.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.get_str(CSRF_TOKEN_KEY).filter(|token| !token.is_empty())
    }

    /// Identity reference stored under `userId`, normalised to a string.
    pub fn user_id(&self) -> Option<String> {
        match self.content.get(USER_ID_KEY)? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    pub fn set_user(&mut self, user_id: impl Into<Value>) -> Result<(), SessionError> {
        self.set(USER_ID_KEY, user_id)
    }

    pub fn clear_user(&mut self) -> Result<(), SessionError> {
        self.set(USER_ID_KEY, Value::Null)
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.destroyed = true;
    }

    /// Records a commit: refreshes the timestamps and clears the dirty flag.
    pub(crate) fn committed(&mut self, now: DateTime<Utc>, expires_at: DateTime<Utc>) {
        self.updated_at = now;
        self.expires_at = expires_at;
        self.modified = false;
    }
}

/// Persisted form of a session; the id is the storage key and is kept out of the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredSession {
    pub(crate) content: SessionContent,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) expires_at: DateTime<Utc>,
}

impl StoredSession {
    pub(crate) fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
