mod config;
mod errors;
mod memory;
mod redis;
mod types;

pub use config::{SessionStoreKind, build_session_store};
pub use errors::StorageError;
pub use memory::InMemorySessionStore;
pub use self::redis::RedisSessionStore;
pub use types::SessionStore;
