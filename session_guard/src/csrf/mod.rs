mod errors;
mod service;

pub use errors::CsrfError;
pub use service::{CSRF_DISABLED_TOKEN, CsrfService, is_safe_method};

pub(crate) use errors::CSRF_FORBIDDEN_MESSAGE;
