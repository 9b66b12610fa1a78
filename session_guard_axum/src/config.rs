//! Central configuration for the session_guard_axum crate

use std::sync::LazyLock;

const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Largest request body the guard middleware buffers while looking for a
/// `_csrf` field.
/// Default: 2 MiB
pub static SESSION_GUARD_BODY_LIMIT: LazyLock<usize> = LazyLock::new(|| {
    parse_body_limit(std::env::var("SESSION_GUARD_BODY_LIMIT").ok().as_deref())
});

fn parse_body_limit(value: Option<&str>) -> usize {
    match value {
        None => DEFAULT_BODY_LIMIT,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid SESSION_GUARD_BODY_LIMIT {:?}, using default", raw);
            DEFAULT_BODY_LIMIT
        }),
    }
}
