use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use super::types::Session;

/// Per-request session slot shared by the guard, the handler and the finalizer.
///
/// The guard binds the loaded session here; a handler may mutate it, replace it
/// (login) or destroy it (logout). The finalizer reads whatever is bound once
/// the handler has produced its response.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    inner: Arc<Mutex<Option<Session>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(session))),
        }
    }

    /// Binds `session`, replacing any session already bound.
    pub async fn bind(&self, session: Session) {
        *self.inner.lock().await = Some(session);
    }

    pub async fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.inner.lock().await
    }

    pub async fn snapshot(&self) -> Option<Session> {
        self.inner.lock().await.clone()
    }

    pub async fn is_bound(&self) -> bool {
        self.inner.lock().await.is_some()
    }
}
