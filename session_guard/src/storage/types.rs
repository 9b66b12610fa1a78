use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::session::{Session, SessionContent};
use crate::storage::errors::StorageError;

/// Persistence port for sessions.
///
/// Implementations must be safe to call concurrently for different ids.
/// Concurrent writes to the same id are last-write-wins.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Persist a new session holding `content` under a fresh random id.
    async fn create(&self, content: SessionContent) -> Result<Session, StorageError>;

    /// Load a session. Expired sessions are reported as absent and removed.
    async fn read(&self, id: &str) -> Result<Option<Session>, StorageError>;

    /// Overwrite content and expiration of an existing session.
    ///
    /// A session that is no longer in the store (destroyed or expired in the
    /// meantime) is not recreated.
    async fn update(&self, session: &Session) -> Result<(), StorageError>;

    /// Remove a session. Removing an unknown id is not an error.
    async fn destroy(&self, id: &str) -> Result<(), StorageError>;

    /// Move the expiration of an existing session to `expires_at`.
    async fn extend(&self, id: &str, expires_at: DateTime<Utc>) -> Result<(), StorageError>;

    /// Drop every expired session, returning how many were removed.
    async fn cleanup_expired(&self) -> Result<usize, StorageError>;
}
