use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    response::{IntoResponse, Response},
};
use http::{StatusCode, request::Parts};

/// User resolved by the guard's user loader, available as an Axum extractor
///
/// Only present on routes behind [`session_guard_middleware`](crate::session_guard_middleware) whose
/// session references a known user. Use `Option<CurrentUser<U>>` on routes that
/// also admit anonymous requests.
#[derive(Clone, Debug)]
pub struct CurrentUser<U>(pub U);

/// Rejection used when a handler requires a user the guard did not load.
#[derive(Debug)]
pub struct MissingUser;

impl IntoResponse for MissingUser {
    fn into_response(self) -> Response {
        tracing::debug!("No user bound to the request");
        (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}

impl<U, S> FromRequestParts<S> for CurrentUser<U>
where
    U: Clone + Send + Sync + 'static,
    S: Send + Sync,
{
    type Rejection = MissingUser;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser<U>>()
            .cloned()
            .ok_or(MissingUser)
    }
}

impl<U, S> OptionalFromRequestParts<S> for CurrentUser<U>
where
    U: Clone + Send + Sync + 'static,
    S: Send + Sync,
{
    type Rejection = MissingUser;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser<U>>().cloned())
    }
}
