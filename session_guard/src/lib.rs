//! session_guard - Session token authentication with CSRF protection
//!
//! This crate decides, for every incoming request, whether it is admitted,
//! rejected or redirected based on a session id carried in a cookie or an
//! `Authorization: Bearer` header. Sessions live in a pluggable
//! [`SessionStore`]; cookie-authenticated requests are protected against CSRF
//! with the double-submit pattern.
//!
//! The crate is framework neutral and works on `http` types. See
//! `session_guard_axum` for the axum integration.

mod config;
mod csrf;
mod guard;
mod session;
mod storage;
mod token;
mod utils;

pub use config::{
    CSRF_DEFAULT_COOKIE_NAME, CookieSettings, CsrfSettings, SESSION_DEFAULT_COOKIE_NAME, SameSite,
    SessionCsrfSettings, SessionLifetime, SessionSettings, Settings,
};

pub use csrf::{CSRF_DISABLED_TOKEN, CsrfError, CsrfService, is_safe_method};

pub use guard::{
    Admission, AuthGuard, Finalizer, GuardError, GuardOptions, GuardOutcome, GuardRequest,
    Rejection, RejectionBody, RejectionKind, UnknownUserPolicy, UserLoader,
};

pub use session::{
    CSRF_TOKEN_KEY, Session, SessionContent, SessionContext, SessionError, USER_ID_KEY,
    commit_session, create_session, destroy_session, get_cookie, read_session, remove_csrf_cookie,
    remove_session_cookie, set_csrf_cookie, set_session_cookie,
};

pub use storage::{
    InMemorySessionStore, RedisSessionStore, SessionStore, SessionStoreKind, StorageError,
    build_session_store,
};

pub use token::{TokenCodec, TokenError, sign_token, sign_token_with_expiry, verify_signed_token};

pub use utils::{UtilError, gen_random_string};
