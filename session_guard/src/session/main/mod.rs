mod cookie;
mod lifecycle;

pub use cookie::{
    get_cookie, remove_csrf_cookie, remove_session_cookie, set_csrf_cookie, set_session_cookie,
};
pub use lifecycle::{commit_session, create_session, destroy_session, read_session};
