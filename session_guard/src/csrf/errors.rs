use thiserror::Error;

use crate::token::TokenError;

pub(crate) const CSRF_FORBIDDEN_MESSAGE: &str = "CSRF token missing or incorrect.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsrfError {
    #[error("{}", CSRF_FORBIDDEN_MESSAGE)]
    Missing,

    #[error("{}", CSRF_FORBIDDEN_MESSAGE)]
    Mismatch,

    /// Misconfiguration or misuse by the application, never the client's fault
    #[error("{0}")]
    Configuration(String),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

impl CsrfError {
    /// Whether the error is the client's fault and must be answered with 403.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Missing | Self::Mismatch)
    }
}
