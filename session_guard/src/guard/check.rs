use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;
use http::header::AUTHORIZATION;

use crate::config::Settings;
use crate::csrf::{CSRF_FORBIDDEN_MESSAGE, CsrfService};
use crate::guard::errors::GuardError;
use crate::guard::finalizer::{Finalizer, clear_session_cookies};
use crate::guard::options::{GuardOptions, UnknownUserPolicy};
use crate::guard::rejection::{Rejection, RejectionKind};
use crate::guard::request::GuardRequest;
use crate::session::{Session, SessionContext, destroy_session, get_cookie, read_session};
use crate::storage::SessionStore;

const COOKIE_NOT_FOUND: &str = "Session cookie not found.";
const AUTHORIZATION_NOT_FOUND: &str = "Authorization header not found.";
const EXPECTED_BEARER: &str = "Expected a bearer token. Scheme is Authorization: Bearer <token>.";
const INVALID_TOKEN: &str = "token invalid or expired";
const UNKNOWN_USER: &str = "The token does not match any user.";

/// Resolves the `userId` stored in a session into an application user.
#[async_trait]
pub trait UserLoader<U>: Send + Sync {
    /// `Ok(None)` when no such user exists.
    async fn load(&self, user_id: &str) -> Result<Option<U>, GuardError>;
}

/// Result of [`AuthGuard::check`].
#[derive(Debug)]
pub enum GuardOutcome<U> {
    Admit(Admission<U>),
    Reject(Rejection),
}

/// An admitted request.
///
/// Hand `context` (and `user`) to the handler, then run `finalizer` on the
/// response it produced.
#[derive(Debug)]
pub struct Admission<U> {
    pub context: SessionContext,
    pub user: Option<U>,
    pub finalizer: Finalizer,
}

enum Credential {
    Present(String),
    Absent(&'static str),
    Malformed,
}

/// Session token authentication guard.
///
/// One guard is built per route configuration and shared across requests;
/// [`check`](Self::check) holds no state between calls.
pub struct AuthGuard<U = ()> {
    store: Arc<dyn SessionStore>,
    settings: Arc<Settings>,
    options: GuardOptions,
    csrf: CsrfService,
    user_loader: Option<Arc<dyn UserLoader<U>>>,
}

impl<U> Clone for AuthGuard<U> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            settings: self.settings.clone(),
            options: self.options.clone(),
            csrf: self.csrf.clone(),
            user_loader: self.user_loader.clone(),
        }
    }
}

impl<U> std::fmt::Debug for AuthGuard<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGuard")
            .field("options", &self.options)
            .field("user_loader", &self.user_loader.is_some())
            .finish()
    }
}

impl AuthGuard<()> {
    pub fn new(store: Arc<dyn SessionStore>, settings: Arc<Settings>, options: GuardOptions) -> Self {
        let csrf = CsrfService::new(settings.clone());
        Self {
            store,
            settings,
            options,
            csrf,
            user_loader: None,
        }
    }
}

impl<U: Send + 'static> AuthGuard<U> {
    /// Resolves the session's `userId` through `loader` on every admitted request.
    pub fn with_user_loader<V, L>(self, loader: L) -> AuthGuard<V>
    where
        L: UserLoader<V> + 'static,
    {
        AuthGuard {
            store: self.store,
            settings: self.settings,
            options: self.options,
            csrf: self.csrf,
            user_loader: Some(Arc::new(loader)),
        }
    }

    pub fn options(&self) -> &GuardOptions {
        &self.options
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn csrf(&self) -> &CsrfService {
        &self.csrf
    }

    /// Decides whether `request` is admitted.
    ///
    /// Client-side problems come back as [`GuardOutcome::Reject`]; only
    /// configuration and storage faults are returned as errors.
    #[tracing::instrument(skip_all, fields(method = %request.method(), cookie = self.options.cookie))]
    pub async fn check(&self, request: &GuardRequest<'_>) -> Result<GuardOutcome<U>, GuardError> {
        let session_id = match self.extract_credential(request.headers()) {
            Credential::Present(id) => id,
            Credential::Absent(description) if !self.options.required => {
                tracing::debug!("{} Admitting anonymous request", description);
                return Ok(GuardOutcome::Admit(self.admit(SessionContext::new(), None)));
            }
            Credential::Absent(description) => {
                tracing::warn!("Rejected request: {}", description);
                return Ok(GuardOutcome::Reject(
                    self.redirectable(Rejection::new(RejectionKind::MissingCredential, description)),
                ));
            }
            Credential::Malformed => {
                tracing::warn!("Rejected request with a malformed Authorization header");
                return Ok(GuardOutcome::Reject(self.redirectable(Rejection::new(
                    RejectionKind::MalformedCredential,
                    EXPECTED_BEARER,
                ))));
            }
        };

        let Some(session) = read_session(self.store.as_ref(), &session_id).await? else {
            tracing::warn!("Rejected request with an invalid or expired session token");
            let mut rejection =
                self.redirectable(Rejection::new(RejectionKind::InvalidOrExpiredToken, INVALID_TOKEN));
            if self.options.cookie {
                clear_session_cookies(rejection.headers_mut(), &self.settings)?;
            }
            return Ok(GuardOutcome::Reject(rejection));
        };

        if self.options.cookie && self.csrf.enabled() {
            match self.csrf.validate(request, &session) {
                Ok(()) => {}
                Err(e) if e.is_forbidden() => {
                    tracing::warn!("Rejected {} request: {}", request.method(), e);
                    return Ok(GuardOutcome::Reject(Rejection::new(
                        RejectionKind::CsrfMismatch,
                        CSRF_FORBIDDEN_MESSAGE,
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }

        let user = match (session.user_id(), &self.user_loader) {
            (Some(user_id), Some(loader)) => match loader.load(&user_id).await? {
                Some(user) => Some(user),
                None => {
                    let rejection = self.reject_unknown_user(session).await?;
                    return Ok(GuardOutcome::Reject(rejection));
                }
            },
            _ => None,
        };

        let context = SessionContext::with_session(session);
        Ok(GuardOutcome::Admit(self.admit(context, user)))
    }

    fn extract_credential(&self, headers: &HeaderMap) -> Credential {
        if self.options.cookie {
            return match get_cookie(headers, &self.settings.session.cookie.name) {
                Some(id) => Credential::Present(id),
                None => Credential::Absent(COOKIE_NOT_FOUND),
            };
        }

        let Some(value) = headers.get(AUTHORIZATION) else {
            return Credential::Absent(AUTHORIZATION_NOT_FOUND);
        };
        if value.is_empty() {
            return Credential::Absent(AUTHORIZATION_NOT_FOUND);
        }
        match value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
        {
            Some(token) => Credential::Present(token.to_string()),
            None => Credential::Malformed,
        }
    }

    async fn reject_unknown_user(&self, mut session: Session) -> Result<Rejection, GuardError> {
        tracing::warn!("Session references an unknown user");
        let mut rejection =
            self.redirectable(Rejection::new(RejectionKind::UnknownPrincipal, UNKNOWN_USER));

        if self.options.unknown_user == UnknownUserPolicy::DestroySession {
            destroy_session(self.store.as_ref(), &mut session).await?;
            if self.options.cookie {
                clear_session_cookies(rejection.headers_mut(), &self.settings)?;
            }
            tracing::debug!("Destroyed session of unknown user");
        }
        Ok(rejection)
    }

    fn redirectable(&self, rejection: Rejection) -> Rejection {
        rejection.redirect_to(self.options.redirect_to.as_deref())
    }

    fn admit(&self, context: SessionContext, user: Option<U>) -> Admission<U> {
        let finalizer = Finalizer::new(
            self.store.clone(),
            self.settings.clone(),
            context.clone(),
            self.options.cookie,
        );
        Admission {
            context,
            user,
            finalizer,
        }
    }
}
