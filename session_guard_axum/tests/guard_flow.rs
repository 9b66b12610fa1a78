//! End-to-end tests driving an axum `Router` protected by the session guard:
//! login issuing session and CSRF cookies, CSRF-protected API calls, bearer
//! authentication, redirects and logout.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Extension, Router,
    body::{Body, to_bytes},
    extract::State,
    http::{Request, StatusCode, header},
    middleware::from_fn_with_state,
    response::Response,
    routing::{get, post},
};
use serde_json::{Value, json};
use session_guard_axum::{
    AuthGuard, CurrentUser, GuardError, GuardOptions, InMemorySessionStore, SessionContext,
    SessionStore, Settings, UserLoader, create_session, destroy_session, session_guard_middleware,
};
use tower::ServiceExt;

const CSRF_COOKIE: &str = "Custom-XSRF-Token";

#[derive(Clone, Debug)]
struct User {
    id: String,
    name: String,
}

struct Users;

#[async_trait]
impl UserLoader<User> for Users {
    async fn load(&self, user_id: &str) -> Result<Option<User>, GuardError> {
        Ok((user_id == "1").then(|| User {
            id: "1".to_string(),
            name: "alice".to_string(),
        }))
    }
}

type Store = Arc<InMemorySessionStore>;

async fn login(State(store): State<Store>, Extension(context): Extension<SessionContext>) -> StatusCode {
    let mut slot = context.lock().await;
    if slot.is_none() {
        *slot = Some(create_session(store.as_ref()).await.unwrap());
    }
    if let Some(session) = slot.as_mut() {
        session.set_user("1").unwrap();
    }
    StatusCode::NO_CONTENT
}

async fn logout(State(store): State<Store>, Extension(context): Extension<SessionContext>) -> StatusCode {
    let mut slot = context.lock().await;
    if let Some(session) = slot.as_mut() {
        destroy_session(store.as_ref(), session).await.unwrap();
    }
    StatusCode::NO_CONTENT
}

async fn whoami(Extension(context): Extension<SessionContext>) -> String {
    match context.snapshot().await {
        Some(session) => session.user_id().unwrap_or_else(|| "anonymous".to_string()),
        None => "no session".to_string(),
    }
}

async fn me(CurrentUser(user): CurrentUser<User>) -> String {
    format!("{}:{}", user.id, user.name)
}

fn app() -> (Store, Router) {
    let store: Store = Arc::new(InMemorySessionStore::default());
    let settings = Arc::new(
        Settings::default()
            .with_session_csrf(true)
            .with_csrf_cookie_name(CSRF_COOKIE),
    );

    let optional_cookie = AuthGuard::new(
        store.clone(),
        settings.clone(),
        GuardOptions::optional().with_cookie(),
    );
    let required_cookie = AuthGuard::new(
        store.clone(),
        settings.clone(),
        GuardOptions::required().with_cookie(),
    );
    let redirecting = AuthGuard::new(
        store.clone(),
        settings.clone(),
        GuardOptions::required().with_cookie().with_redirect("/signin"),
    );
    let bearer = AuthGuard::new(store.clone(), settings, GuardOptions::required())
        .with_user_loader(Users);

    let auth = Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/whoami", get(whoami))
        .route_layer(from_fn_with_state(optional_cookie, session_guard_middleware::<()>));

    let api = Router::new()
        .route(
            "/api/products",
            post(|| async { StatusCode::CREATED }).get(|| async { "[]" }),
        )
        .route_layer(from_fn_with_state(required_cookie, session_guard_middleware::<()>));

    let account = Router::new()
        .route("/account", get(|| async { "account" }))
        .route_layer(from_fn_with_state(redirecting, session_guard_middleware::<()>));

    let token_api = Router::new()
        .route("/token/me", get(me))
        .route_layer(from_fn_with_state(bearer, session_guard_middleware::<User>));

    let router = auth
        .merge(api)
        .merge(account)
        .merge(token_api)
        .with_state(store.clone());
    (store, router)
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    cookies.iter().find_map(|cookie| {
        let pair = cookie.split(';').next()?;
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

struct LoggedIn {
    session_id: String,
    csrf_token: String,
}

async fn log_in(router: &Router) -> LoggedIn {
    let response = send(
        router,
        Request::post("/login").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2, "Expected two cookies in the response.");
    LoggedIn {
        session_id: cookie_value(&cookies, "sessionID").unwrap(),
        csrf_token: cookie_value(&cookies, CSRF_COOKIE).unwrap(),
    }
}

#[tokio::test]
async fn test_login_sets_session_and_csrf_cookies() {
    let (store, router) = app();
    let response = send(&router, Request::post("/login").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    let session_cookie = cookies.iter().find(|c| c.starts_with("sessionID=")).unwrap();
    let csrf_cookie = cookies.iter().find(|c| c.starts_with(CSRF_COOKIE)).unwrap();
    assert!(session_cookie.contains("HttpOnly"));
    assert!(!csrf_cookie.contains("HttpOnly"));

    let session_id = cookie_value(&cookies, "sessionID").unwrap();
    let session = store.read(&session_id).await.unwrap().unwrap();
    assert_eq!(session.user_id().as_deref(), Some("1"));
    assert_eq!(
        session.csrf_token().map(str::to_string),
        cookie_value(&cookies, CSRF_COOKIE)
    );
}

#[tokio::test]
async fn test_post_without_csrf_token_is_forbidden() {
    let (_, router) = app();
    let user = log_in(&router).await;

    let response = send(
        &router,
        Request::post("/api/products")
            .header(header::COOKIE, format!("sessionID={}", user.session_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_text(response).await, "CSRF token missing or incorrect.");
}

#[tokio::test]
async fn test_post_with_csrf_header_is_created() {
    let (_, router) = app();
    let user = log_in(&router).await;

    // The CSRF cookie itself is not required
    let response = send(
        &router,
        Request::post("/api/products")
            .header(header::COOKIE, format!("sessionID={}", user.session_id))
            .header("X-XSRF-TOKEN", &user.csrf_token)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    // The session is refreshed on every admitted request
    assert_eq!(
        cookie_value(&set_cookies(&response), "sessionID"),
        Some(user.session_id)
    );
}

#[tokio::test]
async fn test_post_with_csrf_in_body_is_created() {
    let (_, router) = app();
    let user = log_in(&router).await;

    let json_body = json!({ "name": "chair", "_csrf": user.csrf_token }).to_string();
    let response = send(
        &router,
        Request::post("/api/products")
            .header(header::COOKIE, format!("sessionID={}", user.session_id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json_body))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let form_body = url_encode_csrf(&user.csrf_token);
    let response = send(
        &router,
        Request::post("/api/products")
            .header(header::COOKIE, format!("sessionID={}", user.session_id))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form_body))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

fn url_encode_csrf(token: &str) -> String {
    // Session CSRF tokens are base64url and need no escaping
    format!("name=chair&_csrf={token}")
}

#[tokio::test]
async fn test_post_with_wrong_csrf_token_is_forbidden() {
    let (_, router) = app();
    let user = log_in(&router).await;

    let response = send(
        &router,
        Request::post("/api/products")
            .header(header::COOKIE, format!("sessionID={}", user.session_id))
            .header("X-CSRF-Token", "forged")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_needs_no_csrf_token() {
    let (_, router) = app();
    let user = log_in(&router).await;

    let response = send(
        &router,
        Request::get("/api/products")
            .header(header::COOKIE, format!("sessionID={}", user.session_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_required_without_cookie_is_bad_request() {
    let (_, router) = app();

    let response = send(
        &router,
        Request::get("/api/products").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        body,
        json!({ "code": "invalid_request", "description": "Session cookie not found." })
    );
}

#[tokio::test]
async fn test_optional_without_cookie_passes_through() {
    let (_, router) = app();

    let response = send(&router, Request::get("/whoami").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(body_text(response).await, "no session");
}

#[tokio::test]
async fn test_unknown_session_cookie_is_unauthorized_and_cleared() {
    let (_, router) = app();

    let response = send(
        &router,
        Request::get("/api/products")
            .header(header::COOKIE, "sessionID=stale")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cookies = set_cookies(&response);
    assert_eq!(cookie_value(&cookies, "sessionID").as_deref(), Some(""));
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_redirect_instead_of_rejection() {
    let (_, router) = app();

    let response = send(&router, Request::get("/account").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/signin");
}

#[tokio::test]
async fn test_bearer_unknown_token_is_unauthorized() {
    let (_, router) = app();

    let response = send(
        &router,
        Request::get("/token/me")
            .header(header::AUTHORIZATION, "Bearer unknown")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(challenge.contains("error=\"invalid_token\""));
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["code"], "invalid_token");
}

#[tokio::test]
async fn test_bearer_malformed_header_is_bad_request() {
    let (_, router) = app();

    let response = send(
        &router,
        Request::get("/token/me")
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bearer_token_loads_user() {
    let (store, router) = app();
    let mut session = create_session(store.as_ref()).await.unwrap();
    session.set_user("1").unwrap();
    store.update(&session).await.unwrap();

    let response = send(
        &router,
        Request::get("/token/me")
            .header(header::AUTHORIZATION, format!("Bearer {}", session.id()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(body_text(response).await, "1:alice");
}

#[tokio::test]
async fn test_bearer_token_of_unknown_user_is_unauthorized() {
    let (store, router) = app();
    let mut session = create_session(store.as_ref()).await.unwrap();
    session.set_user("404").unwrap();
    store.update(&session).await.unwrap();

    let response = send(
        &router,
        Request::get("/token/me")
            .header(header::AUTHORIZATION, format!("Bearer {}", session.id()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["description"], "The token does not match any user.");
}

#[tokio::test]
async fn test_logout_clears_cookies_and_session() {
    let (store, router) = app();
    let user = log_in(&router).await;

    let response = send(
        &router,
        Request::post("/logout")
            .header(header::COOKIE, format!("sessionID={}", user.session_id))
            .header("X-XSRF-TOKEN", &user.csrf_token)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookies = set_cookies(&response);
    assert_eq!(cookie_value(&cookies, "sessionID").as_deref(), Some(""));
    assert_eq!(cookie_value(&cookies, CSRF_COOKIE).as_deref(), Some(""));
    assert!(store.read(&user.session_id).await.unwrap().is_none());

    let response = send(
        &router,
        Request::get("/api/products")
            .header(header::COOKIE, format!("sessionID={}", user.session_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_reuses_existing_session() {
    let (_, router) = app();
    let user = log_in(&router).await;

    let response = send(
        &router,
        Request::post("/login")
            .header(header::COOKIE, format!("sessionID={}", user.session_id))
            .header("X-XSRF-TOKEN", &user.csrf_token)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookies = set_cookies(&response);
    assert_eq!(cookie_value(&cookies, "sessionID"), Some(user.session_id));
    assert_eq!(cookie_value(&cookies, CSRF_COOKIE), Some(user.csrf_token));
}
