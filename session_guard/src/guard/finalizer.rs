use std::sync::Arc;

use http::HeaderMap;

use crate::config::Settings;
use crate::guard::errors::GuardError;
use crate::session::{
    SessionContext, commit_session, remove_csrf_cookie, remove_session_cookie, set_csrf_cookie,
    set_session_cookie,
};
use crate::storage::SessionStore;

/// Post-handler step of an admitted request.
///
/// Persists whatever session the handler left in the [`SessionContext`] and
/// writes the matching cookies onto the outgoing response.
pub struct Finalizer {
    store: Arc<dyn SessionStore>,
    settings: Arc<Settings>,
    context: SessionContext,
    cookie: bool,
}

impl std::fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Finalizer")
            .field("context", &self.context)
            .field("cookie", &self.cookie)
            .finish()
    }
}

impl Finalizer {
    pub(crate) fn new(
        store: Arc<dyn SessionStore>,
        settings: Arc<Settings>,
        context: SessionContext,
        cookie: bool,
    ) -> Self {
        Self {
            store,
            settings,
            context,
            cookie,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Commits the bound session and updates `headers`.
    ///
    /// - nothing bound: no-op
    /// - destroyed: removed from the store, cookies cleared in cookie mode
    /// - otherwise: `update` when modified, `extend` when not, cookies rewritten in cookie mode
    #[tracing::instrument(skip_all)]
    pub async fn finalize(self, headers: &mut HeaderMap) -> Result<(), GuardError> {
        let mut slot = self.context.lock().await;
        let Some(session) = slot.as_mut() else {
            return Ok(());
        };

        if session.is_destroyed() {
            self.store.destroy(session.id()).await?;
            if self.cookie {
                clear_session_cookies(headers, &self.settings)?;
            }
            tracing::debug!("Session destroyed by handler");
            return Ok(());
        }

        commit_session(self.store.as_ref(), session, &self.settings.session.lifetime).await?;

        if self.cookie {
            set_session_cookie(headers, &self.settings.session.cookie, session)?;
            if self.settings.session.csrf.enabled {
                match session.csrf_token() {
                    Some(token) => {
                        set_csrf_cookie(headers, &self.settings, token, session.expires_at())?
                    }
                    None => tracing::warn!("Session has no CSRF token, CSRF cookie not written"),
                }
            }
        }
        Ok(())
    }
}

/// Expires the session cookie, and the CSRF cookie when session CSRF is on.
pub(crate) fn clear_session_cookies(
    headers: &mut HeaderMap,
    settings: &Settings,
) -> Result<(), GuardError> {
    remove_session_cookie(headers, &settings.session.cookie)?;
    if settings.session.csrf.enabled {
        remove_csrf_cookie(headers, settings)?;
    }
    Ok(())
}
