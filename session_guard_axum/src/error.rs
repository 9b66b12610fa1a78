use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use session_guard::{GuardError, Rejection, RejectionBody};

/// Response for a request the guard refused.
#[derive(Debug)]
pub struct GuardRejection(pub Rejection);

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        let (status, headers, body) = self.0.into_parts();
        let mut response = match body {
            RejectionBody::Json(value) => (status, Json(value)).into_response(),
            RejectionBody::Text(text) => (status, text).into_response(),
            RejectionBody::Empty => status.into_response(),
        };
        response.headers_mut().extend(headers);
        response
    }
}

/// Response for a guard fault. Details are logged, never sent to the client.
#[derive(Debug)]
pub struct GuardFailure(pub GuardError);

impl IntoResponse for GuardFailure {
    fn into_response(self) -> Response {
        tracing::error!("Session guard failure: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

impl From<GuardError> for GuardFailure {
    fn from(err: GuardError) -> Self {
        Self(err)
    }
}
