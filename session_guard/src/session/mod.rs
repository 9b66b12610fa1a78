mod context;
mod errors;
mod main;
mod types;

pub use context::SessionContext;
pub use errors::SessionError;
pub use main::{
    commit_session, create_session, destroy_session, get_cookie, read_session,
    remove_csrf_cookie, remove_session_cookie, set_csrf_cookie, set_session_cookie,
};
pub use types::{CSRF_TOKEN_KEY, Session, SessionContent, USER_ID_KEY};

pub(crate) use types::StoredSession;
