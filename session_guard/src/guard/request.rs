use http::{HeaderMap, Method};

/// The parts of an incoming request the guard looks at.
///
/// `body_csrf` is the `_csrf` field of a parsed request body, when the caller
/// has one. The guard itself never reads bodies.
#[derive(Debug, Clone, Copy)]
pub struct GuardRequest<'a> {
    method: &'a Method,
    headers: &'a HeaderMap,
    body_csrf: Option<&'a str>,
}

impl<'a> GuardRequest<'a> {
    pub fn new(method: &'a Method, headers: &'a HeaderMap) -> Self {
        Self {
            method,
            headers,
            body_csrf: None,
        }
    }

    pub fn with_body_csrf(mut self, token: Option<&'a str>) -> Self {
        self.body_csrf = token;
        self
    }

    pub fn method(&self) -> &'a Method {
        self.method
    }

    pub fn headers(&self) -> &'a HeaderMap {
        self.headers
    }

    pub fn body_csrf(&self) -> Option<&'a str> {
        self.body_csrf
    }
}
