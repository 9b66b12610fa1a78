use chrono::Utc;
use serde_json::Value;

use crate::config::SessionLifetime;
use crate::session::errors::SessionError;
use crate::session::types::{CSRF_TOKEN_KEY, Session, SessionContent, USER_ID_KEY};
use crate::storage::SessionStore;
use crate::utils::gen_random_string;

/// Creates and persists a new anonymous session with a freshly minted CSRF token.
///
/// Login logic calls this and then attaches the user with [`Session::set_user`].
/// Sessions created any other way lack `csrfToken` and will fail CSRF
/// validation with a configuration error.
#[tracing::instrument(skip_all)]
pub async fn create_session(store: &dyn SessionStore) -> Result<Session, SessionError> {
    let mut content = SessionContent::new();
    content.insert(
        CSRF_TOKEN_KEY.to_string(),
        Value::String(gen_random_string(32)?),
    );
    content.insert(USER_ID_KEY.to_string(), Value::Null);

    let session = store.create(content).await?;
    tracing::debug!("Created session expiring at {}", session.expires_at());
    Ok(session)
}

/// Loads a session, treating an expired one exactly like a missing one.
pub async fn read_session(
    store: &dyn SessionStore,
    session_id: &str,
) -> Result<Option<Session>, SessionError> {
    let Some(session) = store.read(session_id).await? else {
        tracing::debug!("Session not found in store");
        return Ok(None);
    };

    if session.is_expired() {
        tracing::debug!("Session expired at {}", session.expires_at());
        store.destroy(session_id).await?;
        return Ok(None);
    }

    Ok(Some(session))
}

/// Removes the session from the store and marks it destroyed.
pub async fn destroy_session(
    store: &dyn SessionStore,
    session: &mut Session,
) -> Result<(), SessionError> {
    store.destroy(session.id()).await?;
    session.mark_destroyed();
    Ok(())
}

/// Persists the session with a refreshed expiration.
///
/// Modified content is written with `update`; an untouched session only has its
/// expiration pushed forward with `extend`.
pub async fn commit_session(
    store: &dyn SessionStore,
    session: &mut Session,
    lifetime: &SessionLifetime,
) -> Result<(), SessionError> {
    if session.is_destroyed() {
        return Err(SessionError::Content(
            "Cannot commit a destroyed session".to_string(),
        ));
    }

    let now = Utc::now();
    let expires_at = lifetime.expires_at(session.created_at(), now);
    let modified = session.is_modified();
    session.committed(now, expires_at);

    if modified {
        store.update(session).await?;
    } else {
        store.extend(session.id(), expires_at).await?;
    }

    tracing::debug!("Committed session (modified: {modified}), expires at {expires_at}");
    Ok(())
}
