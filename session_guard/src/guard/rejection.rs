use http::header::{LOCATION, WWW_AUTHENTICATE};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::{Value, json};

/// Why the guard refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// Required credential (cookie or `Authorization` header) is absent
    MissingCredential,
    /// `Authorization` header present but not `Bearer <token>`
    MalformedCredential,
    /// No live session for the presented id
    InvalidOrExpiredToken,
    CsrfMismatch,
    /// Session references a user that no longer exists
    UnknownPrincipal,
}

impl RejectionKind {
    pub fn status(self) -> StatusCode {
        match self {
            Self::MissingCredential | Self::MalformedCredential => StatusCode::BAD_REQUEST,
            Self::InvalidOrExpiredToken | Self::UnknownPrincipal => StatusCode::UNAUTHORIZED,
            Self::CsrfMismatch => StatusCode::FORBIDDEN,
        }
    }

    /// CSRF failures are always answered with 403, even on redirecting routes.
    pub fn can_redirect(self) -> bool {
        !matches!(self, Self::CsrfMismatch)
    }
}

/// Response body of a rejection.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionBody {
    Json(Value),
    Text(String),
    Empty,
}

/// A refused request, ready to be rendered by the web framework.
#[derive(Debug, Clone)]
pub struct Rejection {
    kind: RejectionKind,
    description: String,
    redirect_to: Option<String>,
    headers: HeaderMap,
}

impl Rejection {
    pub(crate) fn new(kind: RejectionKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            redirect_to: None,
            headers: HeaderMap::new(),
        }
    }

    /// Locations that are not valid header values are ignored, leaving the
    /// plain 400/401 answer.
    pub(crate) fn redirect_to(mut self, location: Option<&str>) -> Self {
        if !self.kind.can_redirect() {
            return self;
        }
        self.redirect_to = location
            .filter(|loc| {
                let valid = HeaderValue::from_str(loc).is_ok();
                if !valid {
                    tracing::error!("Invalid redirect location {:?}", loc);
                }
                valid
            })
            .map(str::to_string);
        self
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn kind(&self) -> RejectionKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn location(&self) -> Option<&str> {
        self.redirect_to.as_deref()
    }

    /// Headers attached so far, cookie removals included.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn status(&self) -> StatusCode {
        if self.redirect_to.is_some() {
            StatusCode::FOUND
        } else {
            self.kind.status()
        }
    }

    /// Splits the rejection into status, headers and body.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, RejectionBody) {
        let Self {
            kind,
            description,
            redirect_to,
            mut headers,
        } = self;

        if let Some(location) = redirect_to {
            match HeaderValue::from_str(&location) {
                Ok(value) => {
                    headers.insert(LOCATION, value);
                    return (StatusCode::FOUND, headers, RejectionBody::Empty);
                }
                Err(_) => tracing::error!("Invalid redirect location {:?}", location),
            }
        }

        let body = match kind {
            RejectionKind::MissingCredential | RejectionKind::MalformedCredential => {
                RejectionBody::Json(json!({ "code": "invalid_request", "description": description }))
            }
            RejectionKind::InvalidOrExpiredToken | RejectionKind::UnknownPrincipal => {
                let challenge =
                    format!("error=\"invalid_token\", error_description=\"{description}\"");
                match HeaderValue::from_str(&challenge) {
                    Ok(value) => {
                        headers.insert(WWW_AUTHENTICATE, value);
                    }
                    Err(_) => tracing::error!("Failed to build WWW-Authenticate header"),
                }
                RejectionBody::Json(json!({ "code": "invalid_token", "description": description }))
            }
            RejectionKind::CsrfMismatch => RejectionBody::Text(description),
        };

        (kind.status(), headers, body)
    }
}
