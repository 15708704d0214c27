//! Router assembly.

use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::CACHE_CONTROL;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_sessions::SessionManagerLayer;
use tower_sessions_memory_store::MemoryStore;
use tracing::Level;

use crate::auth::{self, require_auth};

use super::handlers;
use super::state::AppState;

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(state.session_cookie.clone())
        .with_secure(false);

    // Token-bearing pages must not be cached.
    let no_store = SetResponseHeaderLayer::overriding(
        CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );

    let public = Router::new()
        .route("/", get(handlers::home))
        .route("/Account/Login", get(handlers::login))
        .route(auth::CALLBACK_PATH, get(handlers::oidc_callback))
        .route("/Account/AccessDenied", get(handlers::access_denied))
        .route("/health", get(handlers::health));

    let protected = Router::new()
        .route("/Account/Logout", get(handlers::logout))
        .route("/Account/Profile", get(handlers::profile))
        .route("/Account/Claims", get(handlers::claims))
        .layer(no_store)
        .layer(from_fn_with_state(state.provider.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(session_layer)
        .layer(trace_layer)
        .with_state(state)
}
