use std::sync::Arc;

use axum::{
    Extension, Form, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use http::{HeaderMap, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;

use session_guard_axum::{
    CsrfService, CurrentUser, GuardRequest, SessionContext, SessionStore, create_session,
    destroy_session,
};

use crate::users::{DemoUser, UserTable};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) users: Arc<UserTable>,
    pub(crate) csrf: CsrfService,
    pub(crate) products: Arc<RwLock<Vec<Product>>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Product {
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContactForm {
    message: String,
    #[serde(rename = "_csrf")]
    csrf: Option<String>,
}

fn internal_error<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    tracing::error!("Request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error".to_string(),
    )
}

/// Attaches the user to the current session, creating one when the request
/// carried none.
pub(crate) async fn login(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
    Json(credentials): Json<Credentials>,
) -> Result<StatusCode, (StatusCode, String)> {
    let Some(user) = state
        .users
        .authenticate(&credentials.email, &credentials.password)
    else {
        tracing::info!("Failed login attempt for {}", credentials.email);
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()));
    };

    let mut slot = context.lock().await;
    if slot.is_none() {
        *slot = Some(
            create_session(state.store.as_ref())
                .await
                .map_err(internal_error)?,
        );
    }
    if let Some(session) = slot.as_mut() {
        session.set_user(user.id.clone()).map_err(internal_error)?;
    }

    tracing::info!("User {} logged in", user.id);
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn logout(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut slot = context.lock().await;
    if let Some(session) = slot.as_mut() {
        destroy_session(state.store.as_ref(), session)
            .await
            .map_err(internal_error)?;
        tracing::info!("Session destroyed on logout");
    }
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn me(CurrentUser(user): CurrentUser<DemoUser>) -> Json<DemoUser> {
    Json(user)
}

pub(crate) async fn list_products(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.products.read().await.clone())
}

pub(crate) async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser<DemoUser>,
    Json(product): Json<Product>,
) -> (StatusCode, Json<Product>) {
    tracing::debug!("User {} created product {}", user.id, product.name);
    state.products.write().await.push(product.clone());
    (StatusCode::CREATED, Json(product))
}

/// Issues a stateless CSRF token for the session-less contact form.
pub(crate) async fn contact_csrf(State(state): State<AppState>) -> Response {
    let mut headers = HeaderMap::new();
    match state.csrf.issue_stateless_token(&mut headers) {
        Ok(token) => (headers, Json(json!({ "csrfToken": token }))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

pub(crate) async fn contact(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    Form(form): Form<ContactForm>,
) -> Result<StatusCode, (StatusCode, String)> {
    let request = GuardRequest::new(&method, &headers).with_body_csrf(form.csrf.as_deref());
    match state.csrf.validate_stateless(&request) {
        Ok(()) => {}
        Err(e) if e.is_forbidden() => return Err((StatusCode::FORBIDDEN, e.to_string())),
        Err(e) => return Err(internal_error(e)),
    }
    tracing::info!("Received contact message ({} bytes)", form.message.len());
    Ok(StatusCode::ACCEPTED)
}
