/// What to do when a session references a user the loader cannot find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownUserPolicy {
    /// Reject the request and leave the session in the store.
    #[default]
    Reject,
    /// Reject the request, destroy the session and remove its cookie.
    DestroySession,
}

/// Per-route guard configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOptions {
    /// Reject requests that carry no credential at all.
    pub required: bool,
    /// Read the session id from the session cookie instead of `Authorization: Bearer`.
    pub cookie: bool,
    /// Answer 400/401 rejections with a redirect to this location.
    pub redirect_to: Option<String>,
    pub unknown_user: UnknownUserPolicy,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self::required()
    }
}

impl GuardOptions {
    pub fn required() -> Self {
        Self {
            required: true,
            cookie: false,
            redirect_to: None,
            unknown_user: UnknownUserPolicy::default(),
        }
    }

    pub fn optional() -> Self {
        Self {
            required: false,
            ..Self::required()
        }
    }

    pub fn with_cookie(mut self) -> Self {
        self.cookie = true;
        self
    }

    pub fn with_bearer(mut self) -> Self {
        self.cookie = false;
        self
    }

    pub fn with_redirect(mut self, location: impl Into<String>) -> Self {
        self.redirect_to = Some(location.into());
        self
    }

    pub fn with_unknown_user(mut self, policy: UnknownUserPolicy) -> Self {
        self.unknown_user = policy;
        self
    }
}
