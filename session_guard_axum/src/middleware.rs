use axum::{
    body::{Body, Bytes, to_bytes},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::{HeaderMap, StatusCode, header::CONTENT_TYPE};
use session_guard::{AuthGuard, GuardOutcome, GuardRequest, is_safe_method};

use super::config::SESSION_GUARD_BODY_LIMIT;
use super::error::{GuardFailure, GuardRejection};
use super::extract::CurrentUser;

const CSRF_BODY_FIELD: &str = "_csrf";

/// Session guard middleware.
///
/// Runs [`AuthGuard::check`] before the handler and the returned finalizer
/// after it. Admitted requests carry the request's
/// [`SessionContext`](session_guard::SessionContext) and, when a user was
/// loaded, a [`CurrentUser`] in their extensions.
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{Router, middleware::from_fn_with_state, routing::post};
/// use session_guard_axum::{
///     AuthGuard, GuardOptions, InMemorySessionStore, Settings, session_guard_middleware,
/// };
///
/// let store = Arc::new(InMemorySessionStore::default());
/// let guard = AuthGuard::new(store, Arc::new(Settings::from_env()), GuardOptions::required().with_cookie());
///
/// let app: Router = Router::new()
///     .route("/api/products", post(|| async { http::StatusCode::CREATED }))
///     .route_layer(from_fn_with_state(guard, session_guard_middleware::<()>));
/// ```
pub async fn session_guard_middleware<U>(
    State(guard): State<AuthGuard<U>>,
    req: Request,
    next: Next,
) -> Response
where
    U: Clone + Send + Sync + 'static,
{
    let (parts, body) = req.into_parts();

    let reads_body = guard.options().cookie
        && guard.csrf().enabled()
        && !is_safe_method(&parts.method)
        && body_may_carry_csrf(&parts.headers);

    let (body, body_csrf) = if reads_body {
        match to_bytes(body, *SESSION_GUARD_BODY_LIMIT).await {
            Ok(bytes) => {
                let token = csrf_field(&parts.headers, &bytes);
                (Body::from(bytes), token)
            }
            Err(e) => {
                tracing::warn!("Failed to buffer request body: {}", e);
                return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
            }
        }
    } else {
        (body, None)
    };

    let request =
        GuardRequest::new(&parts.method, &parts.headers).with_body_csrf(body_csrf.as_deref());
    let outcome = guard.check(&request).await;

    let admission = match outcome {
        Ok(GuardOutcome::Admit(admission)) => admission,
        Ok(GuardOutcome::Reject(rejection)) => return GuardRejection(rejection).into_response(),
        Err(e) => return GuardFailure(e).into_response(),
    };

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(admission.context.clone());
    if let Some(user) = admission.user {
        req.extensions_mut().insert(CurrentUser(user));
    }

    let mut response = next.run(req).await;

    if let Err(e) = admission.finalizer.finalize(response.headers_mut()).await {
        return GuardFailure(e).into_response();
    }
    response
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

fn body_may_carry_csrf(headers: &HeaderMap) -> bool {
    content_type(headers).is_some_and(|ct| {
        ct.starts_with("application/json") || ct.starts_with("application/x-www-form-urlencoded")
    })
}

/// Reads the `_csrf` field from a JSON object or urlencoded form body.
fn csrf_field(headers: &HeaderMap, body: &Bytes) -> Option<String> {
    let ct = content_type(headers)?;
    if ct.starts_with("application/json") {
        let value: serde_json::Value = serde_json::from_slice(body).ok()?;
        value
            .get(CSRF_BODY_FIELD)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    } else {
        url::form_urlencoded::parse(body)
            .find(|(key, _)| key == CSRF_BODY_FIELD)
            .map(|(_, value)| value.into_owned())
    }
}
