use std::env;
use std::sync::Arc;

use crate::config::SessionLifetime;
use crate::storage::errors::StorageError;

use super::memory::InMemorySessionStore;
use super::redis::RedisSessionStore;
use super::types::SessionStore;

/// Session store backend selected by `SESSION_STORE_TYPE` / `SESSION_STORE_URL`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreKind {
    Memory,
    Redis { url: String },
}

impl SessionStoreKind {
    pub fn from_env() -> Result<Self, StorageError> {
        let store_type = env::var("SESSION_STORE_TYPE").unwrap_or_else(|_| "memory".to_string());
        let store_url = env::var("SESSION_STORE_URL").ok();
        Self::parse(&store_type, store_url)
    }

    fn parse(store_type: &str, store_url: Option<String>) -> Result<Self, StorageError> {
        match store_type {
            "memory" => Ok(Self::Memory),
            "redis" => {
                let url = store_url.ok_or_else(|| {
                    StorageError::Config(
                        "SESSION_STORE_URL must be set for the redis session store".to_string(),
                    )
                })?;
                Ok(Self::Redis { url })
            }
            t => Err(StorageError::Config(format!(
                "Unsupported session store type: {t}. Supported types are 'memory' and 'redis'"
            ))),
        }
    }
}

/// Builds the configured store, verifying the connection for network backends.
pub async fn build_session_store(
    kind: &SessionStoreKind,
    lifetime: SessionLifetime,
) -> Result<Arc<dyn SessionStore>, StorageError> {
    let store: Arc<dyn SessionStore> = match kind {
        SessionStoreKind::Memory => Arc::new(InMemorySessionStore::new(lifetime)),
        SessionStoreKind::Redis { url } => {
            let store = RedisSessionStore::open(url, lifetime)?;
            store.init().await.inspect_err(|e| {
                tracing::error!("Failed to connect to Redis: {}", e);
            })?;
            tracing::info!("Connected to redis session store");
            Arc::new(store)
        }
    };
    Ok(store)
}
