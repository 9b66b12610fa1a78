//! Central configuration for the session_guard crate
//!
//! Every key is resolved once into a [`Settings`] value, which is handed to the
//! guard, the CSRF service and the cookie helpers at construction time.
//! Environment variable names are the configuration keys upper-cased with dots
//! replaced by underscores (`settings.session.cookie.name` is read from
//! `SETTINGS_SESSION_COOKIE_NAME`).

use chrono::{DateTime, Duration, Utc};
use std::str::FromStr;

pub const SESSION_DEFAULT_COOKIE_NAME: &str = "sessionID";
pub const CSRF_DEFAULT_COOKIE_NAME: &str = "XSRF-TOKEN";

const DEFAULT_INACTIVITY_TIMEOUT_SECS: i64 = 15 * 60;
const DEFAULT_ABSOLUTE_TIMEOUT_SECS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_CSRF_COOKIE_MAX_AGE_SECS: i64 = 60 * 60;
const MAX_TIMEOUT_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// SameSite attribute written on every cookie the guard emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "none" => Ok(Self::None),
            other => Err(format!("unknown SameSite value: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: SESSION_DEFAULT_COOKIE_NAME.to_string(),
            path: "/".to_string(),
            domain: None,
            secure: false,
            same_site: SameSite::Lax,
        }
    }
}

/// Inactivity and absolute timeouts of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLifetime {
    pub inactivity: Duration,
    pub absolute: Duration,
}

impl Default for SessionLifetime {
    fn default() -> Self {
        Self {
            inactivity: Duration::seconds(DEFAULT_INACTIVITY_TIMEOUT_SECS),
            absolute: Duration::seconds(DEFAULT_ABSOLUTE_TIMEOUT_SECS),
        }
    }
}

impl SessionLifetime {
    pub fn new(inactivity: Duration, absolute: Duration) -> Self {
        Self {
            inactivity,
            absolute,
        }
    }

    /// Expiration of a session created at `created_at` and touched at `now`.
    ///
    /// The inactivity window slides with every commit but never goes past the
    /// absolute cap.
    pub fn expires_at(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        let sliding = now
            .checked_add_signed(self.inactivity)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let cap = created_at
            .checked_add_signed(self.absolute)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        std::cmp::min(sliding, cap)
    }
}

/// `settings.session.csrf.*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCsrfSettings {
    pub enabled: bool,
    pub cookie_name: String,
}

impl Default for SessionCsrfSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            cookie_name: CSRF_DEFAULT_COOKIE_NAME.to_string(),
        }
    }
}

/// `settings.session.*`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSettings {
    pub cookie: CookieSettings,
    pub csrf: SessionCsrfSettings,
    pub lifetime: SessionLifetime,
}

/// `settings.csrf.*`, used when minting stateless tokens for requests without a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfSettings {
    pub enabled: bool,
    pub secret: Option<String>,
    pub cookie_max_age: Duration,
}

impl Default for CsrfSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            secret: None,
            cookie_max_age: Duration::seconds(DEFAULT_CSRF_COOKIE_MAX_AGE_SECS),
        }
    }
}

impl CsrfSettings {
    /// Expiration of a stateless token or CSRF cookie issued at `now`.
    pub fn cookie_expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.cookie_max_age)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub session: SessionSettings,
    pub csrf: CsrfSettings,
}

impl Settings {
    /// Resolves every configuration key from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves every configuration key through `lookup`.
    ///
    /// Unparseable values are logged and replaced by their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cookie = CookieSettings {
            name: lookup("SETTINGS_SESSION_COOKIE_NAME")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.session.cookie.name),
            path: lookup("SETTINGS_SESSION_COOKIE_PATH")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.session.cookie.path),
            domain: lookup("SETTINGS_SESSION_COOKIE_DOMAIN").filter(|v| !v.is_empty()),
            secure: parse_or(
                &lookup,
                "SETTINGS_SESSION_COOKIE_SECURE",
                defaults.session.cookie.secure,
                parse_bool,
            ),
            same_site: parse_or(
                &lookup,
                "SETTINGS_SESSION_COOKIE_SAME_SITE",
                defaults.session.cookie.same_site,
                |v| v.parse().ok(),
            ),
        };

        let session_csrf = SessionCsrfSettings {
            enabled: parse_or(
                &lookup,
                "SETTINGS_SESSION_CSRF_ENABLED",
                defaults.session.csrf.enabled,
                parse_bool,
            ),
            cookie_name: lookup("SETTINGS_SESSION_CSRF_COOKIE_NAME")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.session.csrf.cookie_name),
        };

        let lifetime = SessionLifetime {
            inactivity: parse_or(
                &lookup,
                "SETTINGS_SESSION_EXPIRATION_TIMEOUTS_INACTIVITY",
                defaults.session.lifetime.inactivity,
                parse_seconds,
            ),
            absolute: parse_or(
                &lookup,
                "SETTINGS_SESSION_EXPIRATION_TIMEOUTS_ABSOLUTE",
                defaults.session.lifetime.absolute,
                parse_seconds,
            ),
        };

        let csrf = CsrfSettings {
            enabled: parse_or(
                &lookup,
                "SETTINGS_CSRF_ENABLED",
                defaults.csrf.enabled,
                parse_bool,
            ),
            secret: lookup("SETTINGS_CSRF_SECRET").filter(|v| !v.is_empty()),
            cookie_max_age: parse_or(
                &lookup,
                "SETTINGS_CSRF_COOKIE_MAX_AGE",
                defaults.csrf.cookie_max_age,
                parse_seconds,
            ),
        };

        if cookie.same_site == SameSite::None && !cookie.secure {
            tracing::warn!(
                "SETTINGS_SESSION_COOKIE_SAME_SITE is none without SETTINGS_SESSION_COOKIE_SECURE; cookies will be sent with Secure"
            );
        }

        Self {
            session: SessionSettings {
                cookie,
                csrf: session_csrf,
                lifetime,
            },
            csrf,
        }
    }

    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.session.cookie.name = name.into();
        self
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.session.cookie.secure = secure;
        self
    }

    pub fn with_session_csrf(mut self, enabled: bool) -> Self {
        self.session.csrf.enabled = enabled;
        self
    }

    pub fn with_csrf_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.session.csrf.cookie_name = name.into();
        self
    }

    pub fn with_lifetime(mut self, lifetime: SessionLifetime) -> Self {
        self.session.lifetime = lifetime;
        self
    }

    pub fn with_stateless_csrf(mut self, enabled: bool) -> Self {
        self.csrf.enabled = enabled;
        self
    }

    pub fn with_csrf_secret(mut self, secret: impl Into<String>) -> Self {
        self.csrf.secret = Some(secret.into());
        self
    }
}

fn parse_or<T, F, P>(lookup: &F, key: &str, default: T, parse: P) -> T
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    match lookup(key) {
        None => default,
        Some(raw) => parse(raw.trim()).unwrap_or_else(|| {
            tracing::warn!("Ignoring invalid value {raw:?} for {key}, using default");
            default
        }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Positive whole seconds up to ten years.
fn parse_seconds(value: &str) -> Option<Duration> {
    value
        .parse::<i64>()
        .ok()
        .filter(|secs| (1..=MAX_TIMEOUT_SECS).contains(secs))
        .and_then(Duration::try_seconds)
}
