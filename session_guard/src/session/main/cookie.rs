use chrono::{DateTime, Utc};
use headers::{Cookie, HeaderMapExt};
use http::header::{HeaderMap, SET_COOKIE};

use crate::config::{CookieSettings, SameSite, Settings};
use crate::session::types::Session;
use crate::utils::UtilError;

const EXPIRED_COOKIE_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Reads cookie `name` from the request's `Cookie` header(s).
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.typed_get::<Cookie>()?;
    let value = cookies.get(name)?;
    if value.is_empty() {
        tracing::debug!("Cookie '{}' present but empty", name);
        return None;
    }
    Some(value.to_string())
}

/// Writes the HttpOnly session cookie carrying the session id.
pub fn set_session_cookie(
    headers: &mut HeaderMap,
    cookie: &CookieSettings,
    session: &Session,
) -> Result<(), UtilError> {
    header_set_cookie(
        headers,
        cookie,
        &cookie.name,
        session.id(),
        Some(session.expires_at()),
        true,
    )
}

pub fn remove_session_cookie(headers: &mut HeaderMap, cookie: &CookieSettings) -> Result<(), UtilError> {
    header_set_cookie(headers, cookie, &cookie.name, "", None, true)
}

/// Writes the CSRF cookie. It is readable by scripts so a single-page
/// application can echo it back in `X-XSRF-Token`.
pub fn set_csrf_cookie(
    headers: &mut HeaderMap,
    settings: &Settings,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), UtilError> {
    header_set_cookie(
        headers,
        &settings.session.cookie,
        &settings.session.csrf.cookie_name,
        token,
        Some(expires_at),
        false,
    )
}

pub fn remove_csrf_cookie(headers: &mut HeaderMap, settings: &Settings) -> Result<(), UtilError> {
    header_set_cookie(
        headers,
        &settings.session.cookie,
        &settings.session.csrf.cookie_name,
        "",
        None,
        false,
    )
}

/// Appends a `Set-Cookie` header. `expires_at == None` emits an immediately
/// expiring cookie, which removes it from the client.
fn header_set_cookie(
    headers: &mut HeaderMap,
    attributes: &CookieSettings,
    name: &str,
    value: &str,
    expires_at: Option<DateTime<Utc>>,
    http_only: bool,
) -> Result<(), UtilError> {
    let (max_age, expires) = match expires_at {
        Some(at) => (
            (at - Utc::now()).num_seconds().max(0),
            at.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        ),
        None => (0, EXPIRED_COOKIE_DATE.to_string()),
    };

    let mut cookie = format!(
        "{name}={value}; Path={}; Max-Age={max_age}; Expires={expires}; SameSite={}",
        attributes.path,
        attributes.same_site.as_str()
    );
    if let Some(domain) = &attributes.domain {
        cookie.push_str(&format!("; Domain={domain}"));
    }
    // Browsers drop SameSite=None cookies that lack Secure
    if attributes.secure || attributes.same_site == SameSite::None {
        cookie.push_str("; Secure");
    }
    if http_only {
        cookie.push_str("; HttpOnly");
    }

    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| UtilError::Cookie(format!("Failed to build cookie '{name}'")))?,
    );
    Ok(())
}
