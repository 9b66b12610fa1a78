use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{self, AsyncCommands};

use crate::config::SessionLifetime;
use crate::session::{Session, SessionContent, StoredSession};
use crate::storage::errors::StorageError;
use crate::utils::gen_random_string;

use super::types::SessionStore;

const SESSION_PREFIX: &str = "session";
const SESSION_ID_BYTES: usize = 32;

/// Redis-backed session store.
///
/// Each session is a JSON value under `session:{id}` whose key expires at the
/// session's `expires_at`, so Redis evicts stale sessions on its own.
pub struct RedisSessionStore {
    client: redis::Client,
    lifetime: SessionLifetime,
}

impl RedisSessionStore {
    pub fn new(client: redis::Client, lifetime: SessionLifetime) -> Self {
        Self { client, lifetime }
    }

    pub fn open(url: &str, lifetime: SessionLifetime) -> Result<Self, StorageError> {
        let client = redis::Client::open(url)?;
        Ok(Self::new(client, lifetime))
    }

    /// Verifies that the server is reachable.
    pub async fn init(&self) -> Result<(), StorageError> {
        let _conn = self.client.get_multiplexed_async_connection().await?;
        Ok(())
    }

    fn make_key(id: &str) -> String {
        format!("{SESSION_PREFIX}:{id}")
    }

    /// `SET key value <condition> EXAT <expires_at>`; returns whether the value was written.
    async fn set_conditional(
        conn: &mut redis::aio::MultiplexedConnection,
        key: &str,
        stored: &StoredSession,
        condition: &str,
    ) -> Result<bool, StorageError> {
        let value = serde_json::to_string(stored)?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg(condition)
            .arg("EXAT")
            .arg(stored.expires_at.timestamp())
            .query_async(conn)
            .await?;
        Ok(reply.is_some())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, content: SessionContent) -> Result<Session, StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let now = Utc::now();
        let expires_at = self.lifetime.expires_at(now, now);

        loop {
            let id = gen_random_string(SESSION_ID_BYTES)
                .map_err(|e| StorageError::Storage(e.to_string()))?;
            let session = Session::new(id, content.clone(), now, expires_at);
            let key = Self::make_key(session.id());

            if Self::set_conditional(&mut conn, &key, &session.to_stored(), "NX").await? {
                return Ok(session);
            }
            tracing::warn!("Session id collision, generating a new id");
        }
    }

    async fn read(&self, id: &str) -> Result<Option<Session>, StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::make_key(id);

        let value: Option<String> = conn.get(&key).await?;
        let Some(value) = value else {
            return Ok(None);
        };

        let stored: StoredSession = serde_json::from_str(&value)?;
        if stored.is_expired_at(Utc::now()) {
            let _: () = conn.del(&key).await?;
            return Ok(None);
        }

        Ok(Some(Session::from_stored(id.to_string(), stored)))
    }

    async fn update(&self, session: &Session) -> Result<(), StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::make_key(session.id());
        let stored = session.to_stored();

        if stored.is_expired_at(Utc::now()) {
            let _: () = conn.del(&key).await?;
            return Ok(());
        }

        if !Self::set_conditional(&mut conn, &key, &stored, "XX").await? {
            tracing::debug!("Skipping update of a session that is no longer stored");
        }
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(Self::make_key(id)).await?;
        Ok(())
    }

    async fn extend(&self, id: &str, expires_at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::make_key(id);

        let value: Option<String> = conn.get(&key).await?;
        let Some(value) = value else {
            return Ok(());
        };

        let mut stored: StoredSession = serde_json::from_str(&value)?;
        stored.expires_at = expires_at;
        stored.updated_at = Utc::now();

        if stored.is_expired_at(Utc::now()) {
            let _: () = conn.del(&key).await?;
        } else {
            Self::set_conditional(&mut conn, &key, &stored, "XX").await?;
        }
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, StorageError> {
        // Keys carry their own expiry
        Ok(0)
    }
}
