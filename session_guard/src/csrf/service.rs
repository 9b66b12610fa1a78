use std::sync::Arc;

use chrono::Utc;
use http::{HeaderMap, Method};
use subtle::ConstantTimeEq;

use crate::config::Settings;
use crate::csrf::errors::CsrfError;
use crate::guard::GuardRequest;
use crate::session::{Session, get_cookie, set_csrf_cookie};
use crate::token::{TokenCodec, TokenError};
use crate::utils::gen_random_string;

/// Value handed out instead of a token when stateless CSRF protection is off.
pub const CSRF_DISABLED_TOKEN: &str = "CSRF protection disabled";

const MISSING_SECRET_MESSAGE: &str =
    "[CONFIG] You must provide a secret with the configuration key settings.csrf.secret.";
const MISSING_SESSION_TOKEN_MESSAGE: &str = "The session content does not have a \"csrfToken\" field. \
     Sessions must be created with create_session";

/// Headers checked, in order, after the `_csrf` body field.
const CSRF_HEADERS: [&str; 2] = ["x-csrf-token", "x-xsrf-token"];

const STATELESS_PAYLOAD_BYTES: usize = 32;

/// GET, HEAD and OPTIONS never change state and are exempt from CSRF checks.
pub fn is_safe_method(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD || method == Method::OPTIONS
}

/// Double-submit CSRF protection.
///
/// Cookie-authenticated sessions carry their expected token in the session
/// content (`csrfToken`). Requests without a session may use signed stateless
/// tokens echoed back from the CSRF cookie.
#[derive(Debug, Clone)]
pub struct CsrfService {
    settings: Arc<Settings>,
    codec: TokenCodec,
}

impl CsrfService {
    pub fn new(settings: Arc<Settings>) -> Self {
        let codec = TokenCodec::new(settings.csrf.secret.as_deref());
        Self { settings, codec }
    }

    /// Whether session-bound CSRF protection is active.
    pub fn enabled(&self) -> bool {
        self.settings.session.csrf.enabled
    }

    /// Token the client is expected to submit.
    ///
    /// With a session this is the session's `csrfToken`. Without one, a fresh
    /// signed token is minted, or [`CSRF_DISABLED_TOKEN`] is returned when
    /// stateless protection is turned off.
    pub fn expected_token(&self, session: Option<&Session>) -> Result<String, CsrfError> {
        match session {
            Some(session) => session
                .csrf_token()
                .map(str::to_string)
                .ok_or_else(|| {
                    tracing::error!("Session {} has no CSRF token", session.id());
                    CsrfError::Configuration(MISSING_SESSION_TOKEN_MESSAGE.to_string())
                }),
            None => {
                if !self.settings.csrf.enabled {
                    return Ok(CSRF_DISABLED_TOKEN.to_string());
                }
                if !self.codec.has_secret() {
                    return Err(CsrfError::Configuration(MISSING_SECRET_MESSAGE.to_string()));
                }
                let payload = gen_random_string(STATELESS_PAYLOAD_BYTES)
                    .map_err(|e| CsrfError::Configuration(e.to_string()))?;
                let expires_at = self.settings.csrf.cookie_expires_at(Utc::now());
                Ok(self.codec.sign_with_expiry(&payload, expires_at)?)
            }
        }
    }

    /// First non-empty value of the `_csrf` body field, `X-CSRF-Token`, `X-XSRF-Token`.
    pub fn extract_submitted_token<'r>(&self, request: &GuardRequest<'r>) -> Option<&'r str> {
        if let Some(token) = request.body_csrf().filter(|t| !t.is_empty()) {
            return Some(token);
        }
        let headers = request.headers();
        CSRF_HEADERS.iter().find_map(|name| {
            headers
                .get(*name)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
        })
    }

    /// Checks the submitted token against the one bound to `session`.
    ///
    /// Safe methods always pass.
    pub fn validate(&self, request: &GuardRequest<'_>, session: &Session) -> Result<(), CsrfError> {
        if is_safe_method(request.method()) {
            return Ok(());
        }

        let expected = self.expected_token(Some(session))?;
        let Some(submitted) = self.extract_submitted_token(request) else {
            tracing::debug!("No CSRF token submitted with {} request", request.method());
            return Err(CsrfError::Missing);
        };

        if !tokens_match(submitted, &expected) {
            tracing::debug!("CSRF token mismatch");
            return Err(CsrfError::Mismatch);
        }
        Ok(())
    }

    /// Checks a session-less request: the submitted token must equal the CSRF
    /// cookie and carry a valid, unexpired signature.
    pub fn validate_stateless(&self, request: &GuardRequest<'_>) -> Result<(), CsrfError> {
        if is_safe_method(request.method()) || !self.settings.csrf.enabled {
            return Ok(());
        }
        if !self.codec.has_secret() {
            return Err(CsrfError::Configuration(MISSING_SECRET_MESSAGE.to_string()));
        }

        let cookie = get_cookie(request.headers(), &self.settings.session.csrf.cookie_name)
            .ok_or(CsrfError::Missing)?;
        let submitted = self
            .extract_submitted_token(request)
            .ok_or(CsrfError::Missing)?;

        if !tokens_match(submitted, &cookie) {
            tracing::debug!("Submitted CSRF token does not match the CSRF cookie");
            return Err(CsrfError::Mismatch);
        }

        match self.codec.verify(submitted) {
            Ok(_) => Ok(()),
            Err(TokenError::MissingSecret) => {
                Err(CsrfError::Configuration(MISSING_SECRET_MESSAGE.to_string()))
            }
            Err(e) => {
                tracing::debug!("Rejected stateless CSRF token: {}", e);
                Err(CsrfError::Mismatch)
            }
        }
    }

    /// Mints a stateless token and sets it as the CSRF cookie on `headers`.
    ///
    /// Returns the token so it can also be rendered into a form.
    pub fn issue_stateless_token(&self, headers: &mut HeaderMap) -> Result<String, CsrfError> {
        let token = self.expected_token(None)?;
        if token != CSRF_DISABLED_TOKEN {
            let expires_at = self.settings.csrf.cookie_expires_at(Utc::now());
            set_csrf_cookie(headers, &self.settings, &token, expires_at)
                .map_err(|e| CsrfError::Configuration(e.to_string()))?;
        }
        Ok(token)
    }
}

fn tokens_match(submitted: &str, expected: &str) -> bool {
    bool::from(submitted.as_bytes().ct_eq(expected.as_bytes()))
}
