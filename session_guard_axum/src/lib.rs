//! session_guard_axum - Axum integration for session_guard
//!
//! Wraps [`session_guard::AuthGuard`] in a middleware for
//! `axum::middleware::from_fn_with_state` and renders its rejections as
//! responses.

mod config;
mod error;
mod extract;
mod middleware;

pub use config::SESSION_GUARD_BODY_LIMIT;
pub use error::{GuardFailure, GuardRejection};
pub use extract::{CurrentUser, MissingUser};
pub use middleware::session_guard_middleware;

// Re-export the core crate so applications need a single dependency
pub use session_guard::*;
