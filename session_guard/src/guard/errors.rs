use thiserror::Error;

use crate::csrf::CsrfError;
use crate::session::SessionError;
use crate::storage::StorageError;
use crate::utils::UtilError;

/// Faults the guard cannot turn into a client response.
#[derive(Debug, Error, Clone)]
pub enum GuardError {
    /// Missing secret, session without `csrfToken` and similar misuse
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("User loader error: {0}")]
    UserLoader(String),

    #[error("Cookie error: {0}")]
    Cookie(#[from] UtilError),
}

impl From<SessionError> for GuardError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Storage(e) => Self::Storage(e),
            SessionError::Utils(e) => Self::Cookie(e),
            SessionError::Content(msg) => Self::Configuration(msg),
        }
    }
}

impl From<CsrfError> for GuardError {
    fn from(err: CsrfError) -> Self {
        Self::Configuration(err.to_string())
    }
}
