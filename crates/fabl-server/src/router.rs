use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use fabl_session::{resolve_session, SessionManager};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{CorsConfig, ServerConfig};
use crate::handler;
use crate::state::AppState;

/// Build the axum router with all fabl endpoints.
pub fn build_router(state: AppState, sessions: SessionManager, config: &ServerConfig) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/items", get(handler::list_items))
        .route("/v1/items/import", post(handler::import_item))
        .route("/v1/items/:id", get(handler::get_item))
        .route("/v1/items/:id/export", get(handler::export_item))
        .route("/v1/account", get(handler::get_account))
        .route("/v1/account/login", post(handler::login))
        .route("/v1/account/logout", post(handler::logout))
        .layer(axum::middleware::from_fn_with_state(sessions, resolve_session))
        .layer(DefaultBodyLimit::max(config.max_body_bytes()))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors_layer(&config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let config = config.clone();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin.to_str().map(|o| config.allows(o)).unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}
