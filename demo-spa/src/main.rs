use std::env;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use dotenvy::dotenv;
use tokio::sync::RwLock;

use session_guard_axum::{
    AuthGuard, CsrfService, GuardOptions, SessionStoreKind, Settings, build_session_store,
    session_guard_middleware,
};

mod handlers;
mod server;
mod users;

use handlers::AppState;
use users::{DemoUser, UserTable};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

fn app(state: AppState, settings: Arc<Settings>) -> Router {
    let optional = AuthGuard::new(
        state.store.clone(),
        settings.clone(),
        GuardOptions::optional().with_cookie(),
    );
    let required = AuthGuard::new(
        state.store.clone(),
        settings,
        GuardOptions::required().with_cookie(),
    )
    .with_user_loader(state.users.as_ref().clone());

    let auth = Router::new()
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route_layer(from_fn_with_state(optional, session_guard_middleware::<()>));

    let api = Router::new()
        .route("/api/me", get(handlers::me))
        .route(
            "/api/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route_layer(from_fn_with_state(
            required,
            session_guard_middleware::<DemoUser>,
        ));

    Router::new()
        .route("/contact/csrf", get(handlers::contact_csrf))
        .route("/contact", post(handlers::contact))
        .merge(auth)
        .merge(api)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    server::init_tracing();

    let settings = Arc::new(Settings::from_env());
    let store = build_session_store(&SessionStoreKind::from_env()?, settings.session.lifetime).await?;
    server::spawn_session_cleanup(store.clone(), SESSION_CLEANUP_INTERVAL);

    let state = AppState {
        store,
        users: Arc::new(UserTable::demo()),
        csrf: CsrfService::new(settings.clone()),
        products: Arc::new(RwLock::new(Vec::new())),
    };

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3001);

    server::spawn_http_server(port, app(state, settings)).await??;
    Ok(())
}
