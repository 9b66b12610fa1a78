use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::RwLock;

use crate::config::SessionLifetime;
use crate::session::{Session, SessionContent, StoredSession};
use crate::storage::errors::StorageError;
use crate::utils::gen_random_string;

use super::types::SessionStore;

const SESSION_ID_BYTES: usize = 32;

/// Process-local session store, suitable for tests and single-instance deployments.
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, StoredSession>>,
    lifetime: SessionLifetime,
}

impl InMemorySessionStore {
    pub fn new(lifetime: SessionLifetime) -> Self {
        tracing::info!("Creating new in-memory session store");
        Self {
            entries: RwLock::new(HashMap::new()),
            lifetime,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(SessionLifetime::default())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, content: SessionContent) -> Result<Session, StorageError> {
        let now = Utc::now();
        let expires_at = self.lifetime.expires_at(now, now);
        let mut entries = self.entries.write().await;

        loop {
            let id = gen_random_string(SESSION_ID_BYTES)
                .map_err(|e| StorageError::Storage(e.to_string()))?;
            if let Entry::Vacant(slot) = entries.entry(id.clone()) {
                let session = Session::new(id, content, now, expires_at);
                slot.insert(session.to_stored());
                return Ok(session);
            }
            tracing::warn!("Session id collision, generating a new id");
        }
    }

    async fn read(&self, id: &str) -> Result<Option<Session>, StorageError> {
        let now = Utc::now();
        {
            let entries = self.entries.read().await;
            match entries.get(id) {
                None => return Ok(None),
                Some(stored) if !stored.is_expired_at(now) => {
                    return Ok(Some(Session::from_stored(id.to_string(), stored.clone())));
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(id).is_some_and(|stored| stored.is_expired_at(now)) {
            entries.remove(id);
            tracing::debug!("Removed expired session on read");
        }
        Ok(None)
    }

    async fn update(&self, session: &Session) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(session.id()) {
            Some(stored) => *stored = session.to_stored(),
            None => tracing::debug!("Skipping update of a session that is no longer stored"),
        }
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(id);
        Ok(())
    }

    async fn extend(&self, id: &str, expires_at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        if let Some(stored) = entries.get_mut(id) {
            stored.expires_at = expires_at;
            stored.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, StorageError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, stored| !stored.is_expired_at(now));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!("Removed {removed} expired sessions");
        }
        Ok(removed)
    }
}
